//! LayerForge command-line shell.

pub mod commands;

pub use commands::{Action, Cli, CliError, CliResult, Command, SessionCommand, run};
