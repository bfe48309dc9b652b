//! Command-line configuration for tiff-dpi.
//!
//! This module provides the CLI surface:
//! - `set` patches the resolution of every directory of a TIFF file
//! - `show` lists the current resolution of every directory
//!
//! The positional shape of `set` is `FILE X Y [UNIT] [quiet]`. A literal
//! `quiet` in last position silences the status lines; in the unit slot it
//! also implies inches. The `set` keyword itself may be left out:
//! `tiff-dpi scan.tif 300 300 cm` is the same as `tiff-dpi set scan.tif 300 300 cm`.
//!
//! # Environment Variables
//!
//! - `TIFF_DPI_QUIET` - Suppress status lines (default: false)
//! - `TIFF_DPI_OFFSET` - Position of the TIFF header inside the file (default: 0)
//! - `TIFF_DPI_FORMAT` - Report format, `text` or `json` (default: text)

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::InputError;
use crate::resolution::{PatchSettings, Rational, ResolutionUnit};

/// Positional keyword that silences status output.
pub const QUIET_KEYWORD: &str = "quiet";

/// Subcommand assumed when the first positional argument names none.
const DEFAULT_COMMAND: &str = "set";

/// Words recognized as a subcommand in first positional position.
const COMMAND_NAMES: [&str; 3] = ["set", "show", "help"];

// =============================================================================
// CLI Arguments
// =============================================================================

/// tiff-dpi - Set the resolution of TIFF images in place.
///
/// Rewrites the XResolution, YResolution and ResolutionUnit tags of every
/// image directory, adding them where they are missing, without re-encoding
/// any pixel data.
#[derive(Parser, Debug, Clone)]
#[command(name = "tiff-dpi")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Parse the process arguments, exiting with usage on error.
    pub fn parse_args() -> Self {
        Self::try_parse_args(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Parse `args`, reading a command line without a subcommand as `set`.
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(with_default_command(args))
    }
}

/// Insert the default subcommand after the program name when the first
/// positional argument is not a subcommand. Flag-only command lines such as
/// `--help` are left alone.
fn with_default_command<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let first_positional = args
        .iter()
        .skip(1)
        .map(|arg| arg.to_string_lossy())
        .find(|arg| !arg.starts_with('-'));

    if let Some(arg) = first_positional {
        if !COMMAND_NAMES.contains(&arg.as_ref()) {
            let at = args.len().min(1);
            args.insert(at, OsString::from(DEFAULT_COMMAND));
        }
    }
    args
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Set the resolution of every image in a TIFF file.
    Set(SetConfig),

    /// Show the resolution of every image in a TIFF file.
    Show(ShowConfig),
}

/// Report format for command output.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,

    /// JSON document
    Json,
}

// =============================================================================
// Set Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct SetConfig {
    /// TIFF file to patch.
    pub file: PathBuf,

    /// Horizontal density: a decimal (300, 72.5) or a fraction (300/1).
    pub x_density: String,

    /// Vertical density: a decimal (300, 72.5) or a fraction (300/1).
    pub y_density: String,

    /// Density unit: inches (default), centimeters or none.
    pub unit: Option<String>,

    /// Literal `quiet` to suppress status lines.
    #[arg(value_name = "quiet")]
    pub trailing: Option<String>,

    /// Suppress status lines.
    #[arg(short, long, default_value_t = false, env = "TIFF_DPI_QUIET")]
    pub quiet: bool,

    /// Position of the TIFF header inside the file, for embedded TIFFs.
    #[arg(long, default_value_t = 0, env = "TIFF_DPI_OFFSET")]
    pub offset: u64,

    /// Patch a temporary copy and report, leaving the file untouched.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "TIFF_DPI_FORMAT")]
    pub format: OutputFormat,
}

impl SetConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref trailing) = self.trailing {
            if trailing != QUIET_KEYWORD {
                return Err(format!(
                    "Unexpected argument '{}': only '{}' may follow the unit",
                    trailing, QUIET_KEYWORD
                ));
            }
        }

        self.unit().map_err(|e| e.to_string())?;
        Ok(())
    }

    /// The requested unit. Missing or `quiet` means inches.
    pub fn unit(&self) -> Result<ResolutionUnit, InputError> {
        match self.unit.as_deref() {
            None | Some(QUIET_KEYWORD) => Ok(ResolutionUnit::default()),
            Some(unit) => unit.parse(),
        }
    }

    /// Whether status lines are suppressed, by flag or by a last positional `quiet`.
    pub fn is_quiet(&self) -> bool {
        self.quiet || self.trailing.as_deref().or(self.unit.as_deref()) == Some(QUIET_KEYWORD)
    }

    /// Parse every input into validated patch settings.
    pub fn settings(&self) -> Result<PatchSettings, InputError> {
        let x_resolution: Rational = self.x_density.parse()?;
        let y_resolution: Rational = self.y_density.parse()?;

        Ok(PatchSettings::new(x_resolution, y_resolution)
            .with_unit(self.unit()?)
            .with_quiet(self.is_quiet())
            .with_base_offset(self.offset)
            .with_dry_run(self.dry_run))
    }
}

// =============================================================================
// Show Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ShowConfig {
    /// TIFF file to inspect.
    pub file: PathBuf,

    /// Position of the TIFF header inside the file, for embedded TIFFs.
    #[arg(long, default_value_t = 0, env = "TIFF_DPI_OFFSET")]
    pub offset: u64,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "TIFF_DPI_FORMAT")]
    pub format: OutputFormat,
}

// =============================================================================
// Tests
// =============================================================================
