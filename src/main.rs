//! tiff-dpi - Set the resolution of TIFF images in place.
//!
//! This binary parses the command line, sets up logging and dispatches to the
//! library's patch and inspect operations.

use std::fs::File;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiff_dpi::{
    config::{Cli, Command, OutputFormat, SetConfig, ShowConfig},
    resolution::{patch_file, read_resolutions, PatchReport, ResolutionInfo},
};

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match cli.command {
        Command::Set(config) => run_set(config, cli.verbose),
        Command::Show(config) => run_show(config, cli.verbose),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool, quiet: bool) {
    let env_filter = if verbose {
        "tiff_dpi=debug"
    } else if quiet {
        "tiff_dpi=warn"
    } else {
        "tiff_dpi=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

// =============================================================================
// Set Command
// =============================================================================

fn run_set(config: SetConfig, verbose: bool) -> ExitCode {
    init_logging(verbose, config.is_quiet());

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    // Inputs are checked before the file is opened
    let settings = match config.settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = match patch_file(&config.file, &settings) {
        Ok(report) => report,
        Err(e) => {
            error!("{}: {}", config.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        OutputFormat::Text => {
            if !settings.quiet {
                print_patch_report(&report);
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}

fn print_patch_report(report: &PatchReport) {
    for directory in &report.directories {
        if !directory.inserted.is_empty() {
            let names: Vec<&str> = directory.inserted.iter().map(|tag| tag.name()).collect();
            info!(
                "IFD {} at offset {}: added {}",
                directory.index,
                directory.start,
                names.join(", ")
            );
        }
    }

    if report.dry_run {
        info!(
            "Dry run: {} director{} would be updated, file would grow by {} bytes",
            report.directories.len(),
            if report.directories.len() == 1 { "y" } else { "ies" },
            report.bytes_added
        );
    } else {
        info!("Done.");
    }
}

// =============================================================================
// Show Command
// =============================================================================

fn run_show(config: ShowConfig, verbose: bool) -> ExitCode {
    init_logging(verbose, false);

    let infos = match File::open(&config.file)
        .map_err(tiff_dpi::TiffError::from)
        .and_then(|file| read_resolutions(file, config.offset))
    {
        Ok(infos) => infos,
        Err(e) => {
            error!("{}: {}", config.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        OutputFormat::Text => {
            println!("{}", config.file.display());
            for info in &infos {
                println!("{}", format_info(info));
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&infos) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize resolutions: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}

fn format_info(info: &ResolutionInfo) -> String {
    let density = |value: &Option<tiff_dpi::Rational>| match value {
        Some(rational) => format!("{} ({:.2})", rational, rational.as_f64()),
        None => "-".to_string(),
    };
    let unit = info
        .unit
        .map(|unit| unit.name().to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "  IFD {} at offset {}: x = {}, y = {}, unit = {}",
        info.index,
        info.start,
        density(&info.x_resolution),
        density(&info.y_resolution),
        unit
    )
}
