//! CLI module

mod commands;
mod logging;

pub use commands::{Cli, CliError, SeverityLevel};
pub use logging::init_logging;
