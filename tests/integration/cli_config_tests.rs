//! Command-line parsing tests.
//!
//! Tests verify the positional shape `set FILE X Y [UNIT] [quiet]`, the
//! option flags, and the `show` subcommand.

use std::path::PathBuf;

use clap::Parser;
use tiff_dpi::{Cli, Command, InputError, OutputFormat, Rational, ResolutionUnit};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

fn set_command(args: &[&str]) -> tiff_dpi::SetConfig {
    match parse(args).command {
        Command::Set(config) => config,
        other => panic!("expected set, got {other:?}"),
    }
}

// =============================================================================
// Set Command
// =============================================================================

#[test]
fn test_set_minimal() {
    let config = set_command(&["tiff-dpi", "set", "scan.tif", "300", "300"]);
    assert_eq!(config.file, PathBuf::from("scan.tif"));
    assert!(config.validate().is_ok());

    let settings = config.settings().unwrap();
    assert_eq!(settings.x_resolution, Rational::new(300, 1).unwrap());
    assert_eq!(settings.y_resolution, Rational::new(300, 1).unwrap());
    assert_eq!(settings.unit, ResolutionUnit::Inch);
    assert!(!settings.quiet);
    assert_eq!(settings.base_offset, 0);
}

#[test]
fn test_set_with_unit_and_quiet() {
    let config = set_command(&["tiff-dpi", "set", "scan.tif", "118.11", "118.11", "cm", "quiet"]);
    assert!(config.validate().is_ok());

    let settings = config.settings().unwrap();
    assert_eq!(settings.unit, ResolutionUnit::Centimeter);
    assert!(settings.quiet);
    assert_eq!(settings.x_resolution, Rational::new(11811, 100).unwrap());
}

#[test]
fn test_set_quiet_in_unit_slot() {
    let config = set_command(&["tiff-dpi", "set", "scan.tif", "72", "72", "quiet"]);
    let settings = config.settings().unwrap();
    assert_eq!(settings.unit, ResolutionUnit::Inch);
    assert!(settings.quiet);
}

#[test]
fn test_set_fraction_density() {
    let config = set_command(&["tiff-dpi", "set", "scan.tif", "600/2", "300/1", "dpi"]);
    let settings = config.settings().unwrap();
    assert_eq!(settings.x_resolution, Rational::new(600, 2).unwrap());
    assert_eq!(settings.y_resolution, Rational::new(300, 1).unwrap());
}

#[test]
fn test_set_options() {
    let config = set_command(&[
        "tiff-dpi", "set", "scan.tif", "300", "300", "--offset", "128", "--dry-run", "--format",
        "json", "-q",
    ]);
    assert_eq!(config.format, OutputFormat::Json);

    let settings = config.settings().unwrap();
    assert_eq!(settings.base_offset, 128);
    assert!(settings.dry_run);
    assert!(settings.quiet);
}

#[test]
fn test_set_unrecognized_unit() {
    let config = set_command(&["tiff-dpi", "set", "scan.tif", "300", "300", "cubits"]);
    assert!(config.validate().is_err());
    assert_eq!(
        config.settings(),
        Err(InputError::UnrecognizedUnit("cubits".to_string()))
    );
}

#[test]
fn test_set_density_too_large() {
    let config = set_command(&["tiff-dpi", "set", "scan.tif", "5000000000", "300"]);
    assert!(matches!(
        config.settings(),
        Err(InputError::DensityTooLarge { .. })
    ));
}

#[test]
fn test_set_missing_density() {
    assert!(Cli::try_parse_from(["tiff-dpi", "set", "scan.tif", "300"]).is_err());
}

#[test]
fn test_verbose_is_global() {
    let cli = parse(&["tiff-dpi", "set", "scan.tif", "300", "300", "-v"]);
    assert!(cli.verbose);

    let cli = parse(&["tiff-dpi", "--verbose", "show", "scan.tif"]);
    assert!(cli.verbose);
}

#[test]
fn test_set_keyword_optional() {
    let cli = Cli::try_parse_args(["tiff-dpi", "scan.tif", "72.5", "300", "cm", "quiet"]).unwrap();
    let config = match cli.command {
        Command::Set(config) => config,
        other => panic!("expected set, got {other:?}"),
    };
    assert_eq!(config.file, PathBuf::from("scan.tif"));

    let settings = config.settings().unwrap();
    assert_eq!(settings.x_resolution, Rational::new(145, 2).unwrap());
    assert_eq!(settings.unit, ResolutionUnit::Centimeter);
    assert!(settings.quiet);
}

#[test]
fn test_set_keyword_optional_with_leading_flags() {
    let cli = Cli::try_parse_args(["tiff-dpi", "--verbose", "scan.tif", "300", "300"]).unwrap();
    assert!(cli.verbose);
    assert!(matches!(cli.command, Command::Set(_)));

    let cli = Cli::try_parse_args(["tiff-dpi", "show", "scan.tif"]).unwrap();
    assert!(matches!(cli.command, Command::Show(_)));
}

// =============================================================================
// Show Command
// =============================================================================

#[test]
fn test_show() {
    match parse(&["tiff-dpi", "show", "scan.tif", "--format", "json"]).command {
        Command::Show(config) => {
            assert_eq!(config.file, PathBuf::from("scan.tif"));
            assert_eq!(config.format, OutputFormat::Json);
            assert_eq!(config.offset, 0);
        }
        other => panic!("expected show, got {other:?}"),
    }
}
