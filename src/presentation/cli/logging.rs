//! Diagnostics output
//!
//! Records go to stdout, so every log line is written to stderr.

use super::commands::SeverityLevel;

/// Installs the global subscriber; later calls are ignored
pub fn init_logging(level: SeverityLevel) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level.as_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
