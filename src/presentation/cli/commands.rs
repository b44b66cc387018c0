//! CLI arguments using clap

use clap::{ArgAction, Parser};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;

/// Errors raised while interpreting the command line
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    #[error("Invalid severity level '{0}' (expected ERROR, WARN, INFO or DEBUG)")]
    InvalidSeverityLevel(String),
}

/// usn_dump - NTFS change journal dumper
///
/// Streams `$UsnJrnl:$J` records from an extracted journal file, a
/// directory of extracted journals, a disk image or a live volume handle,
/// and prints each record as one JSON object per line.
#[derive(Parser, Debug)]
#[command(name = "usn_dump")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dump NTFS change journal records as JSON lines", long_about = None)]
pub struct Cli {
    /// Journal file, directory, image, or volume handle (\\.\C:)
    #[arg(short, long)]
    pub source: String,

    /// Treat the source as a volume (true) or as a file or directory (false)
    #[arg(
        short = 'v',
        long = "is_volume",
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub is_volume: Option<bool>,

    /// Diagnostics level written to stderr: ERROR, WARN, INFO or DEBUG
    #[arg(long, default_value = "ERROR")]
    pub debug: String,
}

impl Cli {
    /// Returns the requested diagnostics level
    pub fn severity(&self) -> Result<SeverityLevel, CliError> {
        self.debug.parse()
    }
}

/// Diagnostics level selected with `--debug`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl SeverityLevel {
    pub fn as_level(&self) -> Level {
        match self {
            SeverityLevel::Error => Level::ERROR,
            SeverityLevel::Warn => Level::WARN,
            SeverityLevel::Info => Level::INFO,
            SeverityLevel::Debug => Level::DEBUG,
        }
    }
}

impl FromStr for SeverityLevel {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ERROR" => Ok(SeverityLevel::Error),
            "WARN" => Ok(SeverityLevel::Warn),
            "INFO" => Ok(SeverityLevel::Info),
            "DEBUG" => Ok(SeverityLevel::Debug),
            _ => Err(CliError::InvalidSeverityLevel(s.to_string())),
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SeverityLevel::Error => "ERROR",
            SeverityLevel::Warn => "WARN",
            SeverityLevel::Info => "INFO",
            SeverityLevel::Debug => "DEBUG",
        };
        f.write_str(name)
    }
}
