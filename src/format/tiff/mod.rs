//! TIFF reading and ImageDescription patching.
//!
//! This module handles TIFF and BigTIFF files, the containers OME-TIFF is
//! built on.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values must be read and written respecting this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets (max 4GB files),
//!   while BigTIFF uses 64-bit offsets. The parser and patcher handle both.
//!
//! - **IFD (Image File Directory)**: Contains metadata and pointers to image data.
//!   OME-TIFF keeps the OME-XML document in the ImageDescription of the first IFD.
//!
//! - **Inline vs offset values**: Small values are stored inline in the IFD entry,
//!   larger values are stored at an offset pointed to by the entry.

mod parser;
mod patch;
mod tags;
mod values;

pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use patch::{overwrite_description, patch_description, read_description, PatchOutcome};
pub use tags::{FieldType, TiffTag};
pub use values::{parse_u64_array, ValueReader};
