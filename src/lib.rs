//! # OME Metadata Editor
//!
//! Rewrites the OME-XML metadata of microscopy images without touching their
//! pixel data.
//!
//! The editor reads an OME-XML document (from an `.xml` file or the
//! ImageDescription of an OME-TIFF), applies a declarative mapping of channel
//! names, fluorophores and pixel sizes, optionally prunes secondary images and
//! structured annotations, and writes the result to a standalone `.xml` file or
//! back into an existing TIFF.
//!
//! ## Features
//!
//! - **In-place TIFF patching**: ImageDescription is rewritten in place when it
//!   fits, otherwise relocated to the end of the file; no other tag moves
//! - **Classic TIFF and BigTIFF**, little- and big-endian
//! - **Mapping files** in YAML or JSON
//! - **Deterministic output**: canonical declaration, indentation and
//!   attribute order
//!
//! ## Architecture
//!
//! - [`mapping`] - Rename/override rule table and its file loader
//! - [`ome`] - OME-XML document model, parser, serializer and mutation engine
//! - [`mod@format`] - TIFF parsing and ImageDescription patching, path classification
//! - [`io`] - Random-access file handles
//! - [`source`] - Metadata sources for input files
//! - [`convert`] - External conversion service for new TIFF outputs
//! - [`edit`] - End-to-end edit orchestration
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use ome_meta_editor::{
//!     load_mapping, CommandConverter, EditRequest, EditService, FileMetadataSource,
//! };
//!
//! let mapping = load_mapping("rules.yaml").unwrap();
//! let service = EditService::new(FileMetadataSource::new(), CommandConverter::default());
//! let request = EditRequest::new("slide.ome.tif", "slide.ome.tif").with_mapping(mapping);
//! let report = service.run(&request).unwrap();
//! println!("{:?}", report.action);
//! ```

pub mod config;
pub mod convert;
pub mod edit;
pub mod error;
pub mod format;
pub mod io;
pub mod mapping;
pub mod ome;
pub mod source;

// Re-export commonly used types
pub use config::{Cli, Command, EditConfig, ShowConfig};
pub use convert::{CommandConverter, Converter};
pub use edit::{EditReport, EditRequest, EditService, OutputAction};
pub use error::{
    ConvertError, EditError, IoError, MappingError, MetadataError, PatchError, SourceError,
    TiffError,
};
pub use format::tiff::{
    overwrite_description, read_description, ByteOrder, FieldType, Ifd, IfdEntry, PatchOutcome,
    TiffHeader, TiffTag, ValueReader,
};
pub use format::{detect_input, is_tiff_header, InputFormat, OutputTarget};
pub use io::{PatchFile, RangeReader};
pub use mapping::{load_mapping, Category, MappingTable};
pub use ome::{apply, ApplySummary, Document, ElementId};
pub use source::{FileMetadataSource, MetadataSource};
