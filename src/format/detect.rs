//! Input and output classification.
//!
//! The editor decides what to do with a path from its extension and, for
//! inputs, from the first bytes of the file:
//!
//! - **Inputs**: `.xml` files are read as OME-XML text; anything that starts
//!   with a TIFF/BigTIFF header is read through its ImageDescription.
//! - **Outputs**: `.xml`/`.XML` receive the serialized document; an existing
//!   `.tif`/`.tiff` is patched in place; a missing one is created by the
//!   conversion service.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::SourceError;

use super::tiff::{ByteOrder, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};

// =============================================================================
// Input Format
// =============================================================================

/// Detected kind of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Standalone OME-XML document
    OmeXml,

    /// TIFF or BigTIFF container carrying OME-XML in its ImageDescription
    Tiff,
}

impl InputFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            InputFormat::OmeXml => "OME-XML",
            InputFormat::Tiff => "TIFF",
        }
    }
}

/// Detect the format of an input file.
///
/// An `.xml` extension (any case) wins; otherwise the first bytes are checked
/// for a TIFF header, so `.ome.tif`, `.btf` and extension-less files work.
pub fn detect_input(path: &Path) -> Result<InputFormat, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    if has_extension(path, &["xml"], false) {
        return Ok(InputFormat::OmeXml);
    }

    let mut header = Vec::with_capacity(BIGTIFF_HEADER_SIZE);
    File::open(path)?
        .take(BIGTIFF_HEADER_SIZE as u64)
        .read_to_end(&mut header)?;

    if is_tiff_header(&header) {
        Ok(InputFormat::Tiff)
    } else {
        Err(SourceError::UnsupportedInput(path.to_path_buf()))
    }
}

/// Check if bytes represent a valid TIFF header.
///
/// This is a quick check that can be used before attempting full parsing.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    if bytes.len() < TIFF_HEADER_SIZE {
        return false;
    }

    let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
    let byte_order = match magic {
        0x4949 => ByteOrder::LittleEndian,
        0x4D4D => ByteOrder::BigEndian,
        _ => return false,
    };

    let version = byte_order.read_u16(&bytes[2..4]);
    version == 42 || version == 43
}

// =============================================================================
// Output Target
// =============================================================================

/// What to do with the edited metadata for a given output path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write the serialized document as a standalone XML file
    Xml(PathBuf),

    /// Patch the ImageDescription of an existing TIFF
    PatchTiff(PathBuf),

    /// Create the TIFF with the conversion service.
    ///
    /// `replace_existing` is set when an existing file must be removed first.
    ConvertTiff {
        path: PathBuf,
        replace_existing: bool,
    },

    /// Neither XML nor TIFF, or a directory
    Unsupported(PathBuf),
}

impl OutputTarget {
    /// Classify an output path.
    ///
    /// `.xml` and `.XML` are XML outputs. `.tif` and `.tiff` are TIFF outputs:
    /// an existing regular file is patched unless `overwrite` is set, in which
    /// case it is re-created by conversion like a missing one.
    pub fn classify(path: &Path, overwrite: bool) -> Self {
        let owned = path.to_path_buf();

        if path.is_dir() {
            return OutputTarget::Unsupported(owned);
        }

        if has_extension(path, &["xml", "XML"], true) {
            return OutputTarget::Xml(owned);
        }

        if !has_extension(path, &["tif", "tiff"], true) {
            return OutputTarget::Unsupported(owned);
        }

        match (path.is_file(), overwrite) {
            (true, false) => OutputTarget::PatchTiff(owned),
            (true, true) => OutputTarget::ConvertTiff {
                path: owned,
                replace_existing: true,
            },
            (false, _) => OutputTarget::ConvertTiff {
                path: owned,
                replace_existing: false,
            },
        }
    }

    /// The output path.
    pub fn path(&self) -> &Path {
        match self {
            OutputTarget::Xml(p) | OutputTarget::PatchTiff(p) | OutputTarget::Unsupported(p) => p,
            OutputTarget::ConvertTiff { path, .. } => path,
        }
    }
}

/// Whether `path` ends in one of `extensions`.
fn has_extension(path: &Path, extensions: &[&str], case_sensitive: bool) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };

    extensions.iter().any(|candidate| {
        if case_sensitive {
            ext == *candidate
        } else {
            ext.eq_ignore_ascii_case(candidate)
        }
    })
}

// =============================================================================
// Tests
// =============================================================================
