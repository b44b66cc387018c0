//! Command line parsing tests

use clap::Parser;
use rstest::*;
use tracing::Level;
use usn_dump::presentation::cli::{Cli, CliError, SeverityLevel};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("usn_dump").chain(args.iter().copied())).unwrap()
}

// ============================================================================
// Arguments
// ============================================================================

#[rstest]
fn test_defaults() {
    let cli = parse(&["-s", "C$J"]);
    assert_eq!(cli.source, "C$J");
    assert_eq!(cli.is_volume, None);
    assert_eq!(cli.debug, "ERROR");
    assert_eq!(cli.severity(), Ok(SeverityLevel::Error));
}

#[rstest]
#[case(&["-s", r"\\.\C:", "-v"], Some(true))]
#[case(&["-v", "-s", r"\\.\C:"], Some(true))]
#[case(&["-s", "dir", "-v", "false"], Some(false))]
#[case(&["--source", "img", "--is_volume", "true"], Some(true))]
#[case(&["--source", "img", "--is_volume", "false"], Some(false))]
fn test_is_volume_override(#[case] args: &[&str], #[case] expected: Option<bool>) {
    assert_eq!(parse(args).is_volume, expected);
}

#[rstest]
fn test_source_is_required() {
    assert!(Cli::try_parse_from(["usn_dump", "--debug", "INFO"]).is_err());
}

#[rstest]
fn test_is_volume_rejects_non_boolean() {
    assert!(Cli::try_parse_from(["usn_dump", "-s", "x", "-v", "maybe"]).is_err());
}

// ============================================================================
// Severity levels
// ============================================================================

#[rstest]
#[case("ERROR", SeverityLevel::Error, Level::ERROR)]
#[case("warn", SeverityLevel::Warn, Level::WARN)]
#[case("Info", SeverityLevel::Info, Level::INFO)]
#[case("DEBUG", SeverityLevel::Debug, Level::DEBUG)]
fn test_severity_levels(#[case] name: &str, #[case] expected: SeverityLevel, #[case] level: Level) {
    let cli = parse(&["-s", "x", "--debug", name]);
    let severity = cli.severity().unwrap();

    assert_eq!(severity, expected);
    assert_eq!(severity.as_level(), level);
    assert_eq!(severity.to_string(), name.to_ascii_uppercase());
}

#[rstest]
#[case("TRACE")]
#[case("")]
#[case("verbose")]
fn test_invalid_severity(#[case] name: &str) {
    let cli = parse(&["-s", "x", "--debug", name]);
    assert_eq!(
        cli.severity(),
        Err(CliError::InvalidSeverityLevel(name.to_string()))
    );
}
