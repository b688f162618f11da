//! First-time conversion of an input image into a TIFF container.
//!
//! The editor only rewrites metadata of TIFFs that already exist. Creating a
//! new one is delegated to an external converter such as Bio-Formats'
//! `bfconvert`.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::ConvertError;

/// Default converter program.
pub const DEFAULT_CONVERTER: &str = "bfconvert";

// =============================================================================
// Converter Trait
// =============================================================================

/// Converts `input` into a new TIFF at `output`.
pub trait Converter {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError>;
}

// =============================================================================
// CommandConverter
// =============================================================================

/// Runs an external program as `<program> [args...] <input> <output>`.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add fixed arguments placed before the input and output paths.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CommandConverter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER)
    }
}

impl Converter for CommandConverter {
    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        debug!(
            program = %self.program,
            input = %input.display(),
            output = %output.display(),
            "Running converter"
        );

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| ConvertError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ConvertError::Failed {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }

        info!(output = %output.display(), "Conversion complete");
        Ok(())
    }
}
