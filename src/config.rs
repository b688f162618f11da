//! Command-line configuration for the metadata editor.
//!
//! # Example
//!
//! ```ignore
//! use ome_meta_editor::config::Cli;
//!
//! let cli = Cli::parse();
//! match cli.into_command() { /* ... */ }
//! ```
//!
//! # Environment Variables
//!
//! - `OME_MAPPING` - Mapping file (`.yaml`, `.yml` or `.json`)
//! - `OME_NO_CHANGES` - Keep secondary images and annotations (default: false)
//! - `OME_OVERWRITE` - Re-create an existing TIFF output (default: false)
//! - `OME_CONVERTER` - Conversion program for new TIFF outputs (default: bfconvert)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::convert::DEFAULT_CONVERTER;
use crate::mapping::MappingFormat;

// =============================================================================
// CLI Arguments
// =============================================================================

/// OME Metadata Editor - rename channels and override sizes in OME-XML.
///
/// Reads OME-XML from an `.xml` file or an OME-TIFF, applies a mapping, and
/// writes it to an `.xml` file or into an existing TIFF without touching its
/// pixel data.
#[derive(Parser, Debug, Clone)]
#[command(name = "ome-meta-editor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Edit metadata and write it to an XML file or TIFF.
    Edit(EditConfig),

    /// Print the OME-XML stored in a TIFF's ImageDescription.
    Show(ShowConfig),
}

// =============================================================================
// Edit Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct EditConfig {
    /// Input image (OME-TIFF) or OME-XML file.
    pub input: PathBuf,

    /// Output `.xml` file, or `.tif`/`.tiff` container.
    pub output: PathBuf,

    /// Mapping file with rename and override rules.
    #[arg(short, long, env = "OME_MAPPING")]
    pub mapping: Option<PathBuf>,

    /// Keep all images and structured annotations.
    ///
    /// Mapping rules are still applied.
    #[arg(long, default_value_t = false, env = "OME_NO_CHANGES")]
    pub no_changes: bool,

    /// Re-create an existing TIFF output through the converter instead of
    /// patching it.
    #[arg(long, default_value_t = false, env = "OME_OVERWRITE")]
    pub overwrite: bool,

    /// Program used to create TIFF outputs that do not exist yet.
    #[arg(long, default_value = DEFAULT_CONVERTER, env = "OME_CONVERTER")]
    pub converter: String,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl EditConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.input.exists() {
            return Err(format!("Input file does not exist: {}", self.input.display()));
        }

        if let Some(ref mapping) = self.mapping {
            MappingFormat::from_path(mapping).map_err(|e| e.to_string())?;
            if !mapping.is_file() {
                return Err(format!("Mapping file does not exist: {}", mapping.display()));
            }
        }

        if self.converter.trim().is_empty() {
            return Err("converter must not be empty".to_string());
        }

        Ok(())
    }

    /// Whether secondary images and annotations are removed.
    pub fn prune(&self) -> bool {
        !self.no_changes
    }
}

// =============================================================================
// Show Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ShowConfig {
    /// TIFF file to read.
    pub file: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
