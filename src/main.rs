//! OME Metadata Editor - command-line entry point.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ome_meta_editor::{
    config::{Cli, Command, EditConfig, ShowConfig},
    convert::CommandConverter,
    edit::{EditRequest, EditService, OutputAction},
    format::tiff::read_description,
    mapping::{load_mapping, MappingTable},
    source::FileMetadataSource,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Edit(config) => run_edit(config),
        Command::Show(config) => run_show(config),
    }
}

// =============================================================================
// Edit Command
// =============================================================================

fn run_edit(config: EditConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let mapping = match config.mapping {
        Some(ref path) => match load_mapping(path) {
            Ok(table) => table,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => MappingTable::empty(),
    };

    let request = EditRequest::new(&config.input, &config.output)
        .with_mapping(mapping)
        .with_prune(config.prune())
        .with_overwrite(config.overwrite);

    let service = EditService::new(
        FileMetadataSource::new(),
        CommandConverter::new(config.converter.clone()),
    );

    match service.run(&request) {
        Ok(report) => {
            match report.action {
                OutputAction::WroteXml { bytes } => {
                    info!("Wrote {} bytes to {}", bytes, config.output.display())
                }
                OutputAction::Patched(outcome) => {
                    info!("Patched {} ({:?})", config.output.display(), outcome)
                }
                OutputAction::Converted => info!("Converted to {}", config.output.display()),
            }
            info!("Finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Show Command
// =============================================================================

fn run_show(config: ShowConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    match read_description(&config.file) {
        Ok(Some(text)) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("Error: {} has no ImageDescription", config.file.display());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "ome_meta_editor=debug"
    } else {
        "ome_meta_editor=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
