//! Obtaining OME-XML text for an input image.
//!
//! Decoding proprietary microscopy formats is out of scope; callers that need
//! it implement [`MetadataSource`] over their own extraction service.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::SourceError;
use crate::format::tiff::read_description;
use crate::format::{detect_input, InputFormat};

// =============================================================================
// MetadataSource Trait
// =============================================================================

/// Something that can produce the OME-XML metadata of an input file.
pub trait MetadataSource {
    /// Return the metadata document of `path` as XML text.
    fn read_metadata(&self, path: &Path) -> Result<String, SourceError>;
}

// =============================================================================
// FileMetadataSource
// =============================================================================

/// Reads standalone `.xml` files and the ImageDescription of OME-TIFF files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMetadataSource;

impl FileMetadataSource {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataSource for FileMetadataSource {
    fn read_metadata(&self, path: &Path) -> Result<String, SourceError> {
        let format = detect_input(path)?;
        debug!(path = %path.display(), format = format.name(), "Reading metadata");

        match format {
            InputFormat::OmeXml => Ok(fs::read_to_string(path)?),
            InputFormat::Tiff => {
                read_description(path)?.ok_or_else(|| SourceError::NoDescription(path.to_path_buf()))
            }
        }
    }
}
