//! # tessel
//!
//! Library half of the `tessel` binary: the clap command tree, the command
//! implementations and configuration loading. `main.rs` only sets up
//! logging and hands the parsed CLI to `cli::execute`.

pub mod cli;
pub mod settings;
