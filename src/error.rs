use std::path::PathBuf;

use thiserror::Error;

/// I/O errors that can occur when reading from or writing to a container file
#[derive(Debug, Error)]
pub enum IoError {
    /// Error from the underlying file system
    #[error("File system error: {0}")]
    Fs(#[from] std::io::Error),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

impl TiffError {
    /// Whether this error means the bytes never looked like a TIFF at all,
    /// as opposed to a TIFF with a damaged directory structure.
    pub fn is_header_error(&self) -> bool {
        matches!(
            self,
            TiffError::InvalidMagic(_)
                | TiffError::InvalidVersion(_)
                | TiffError::InvalidBigTiffOffsetSize(_)
                | TiffError::FileTooSmall { .. }
        )
    }
}

/// Errors returned by the ImageDescription patcher
#[derive(Debug, Error)]
pub enum PatchError {
    /// Target file does not exist
    #[error("No such file: {}", .0.display())]
    NoSuchFile(PathBuf),

    /// Target file does not start with a TIFF or BigTIFF header
    #[error("Not a TIFF file: {reason}")]
    NotATiff { reason: String },

    /// The relocated data would land beyond what a classic TIFF can address
    #[error("Offset {0} does not fit in a classic TIFF (max 4 GiB); convert to BigTIFF first")]
    OffsetOverflow(u64),

    /// The file has a TIFF header but its directory structure is broken
    #[error("TIFF error: {0}")]
    Tiff(TiffError),

    /// Read or write failure
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

impl From<TiffError> for PatchError {
    fn from(err: TiffError) -> Self {
        match err {
            TiffError::Io(io) => PatchError::Io(io),
            err if err.is_header_error() => PatchError::NotATiff {
                reason: err.to_string(),
            },
            err => PatchError::Tiff(err),
        }
    }
}

impl From<std::io::Error> for PatchError {
    fn from(err: std::io::Error) -> Self {
        PatchError::Io(IoError::Fs(err))
    }
}

/// Errors from parsing OME-XML text into a document
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Input is not well-formed XML
    #[error("Malformed metadata at byte {position}: {message}")]
    Malformed { position: u64, message: String },
}

/// Errors from loading a mapping file
#[derive(Debug, Error)]
pub enum MappingError {
    /// Mapping file could not be read
    #[error("Cannot read mapping file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Mapping file is not valid YAML/JSON or has the wrong shape
    #[error("Cannot parse mapping file: {0}")]
    Parse(String),

    /// A rule list item is not a single `old: new` pair of scalars
    #[error("Invalid rule in '{category}': {message}")]
    InvalidRule {
        category: &'static str,
        message: String,
    },

    /// File extension is neither YAML nor JSON
    #[error("Unsupported mapping file extension: {0}")]
    UnsupportedFormat(String),
}

/// Errors from obtaining metadata text for an input image
#[derive(Debug, Error)]
pub enum SourceError {
    /// Input file does not exist
    #[error("Input file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// No metadata source can handle this input
    #[error("Unsupported input format: {}", .0.display())]
    UnsupportedInput(PathBuf),

    /// TIFF input carries no ImageDescription
    #[error("TIFF has no ImageDescription to read metadata from: {}", .0.display())]
    NoDescription(PathBuf),

    /// Failure reading a TIFF input
    #[error("Cannot read TIFF metadata: {0}")]
    Patch(#[from] PatchError),

    /// Failure reading an XML input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the external conversion service
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The converter program could not be started
    #[error("Failed to start converter '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The converter ran but reported failure
    #[error("Converter '{program}' failed with {status}")]
    Failed { program: String, status: String },
}

/// Top-level errors of a metadata edit run
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// Output path is neither an XML file nor a TIFF file
    #[error("Unsupported output target: {}", .0.display())]
    UnsupportedOutput(PathBuf),

    /// Writing the standalone XML output failed
    #[error("Cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
