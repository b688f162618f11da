//! TIFF tag and field type definitions.
//!
//! This module defines the vocabulary for TIFF parsing, including:
//! - Field types that determine how values are encoded
//! - Tag IDs that identify metadata fields
//!
//! The definitions support both classic TIFF and BigTIFF formats.

// =============================================================================
// TIFF Field Types
// =============================================================================

/// TIFF field types that determine how values are encoded.
///
/// Each field type has a specific size in bytes, which is critical for:
/// - Determining if a value fits inline in an IFD entry
/// - Knowing how many bytes an out-of-line value occupies
///
/// All TIFF 6.0 and BigTIFF types are listed because the patcher must size
/// the ImageDescription entry whatever type a writer chose for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer (1 byte)
    Byte = 1,

    /// 8-bit ASCII character (1 byte)
    Ascii = 2,

    /// Unsigned 16-bit integer (2 bytes)
    Short = 3,

    /// Unsigned 32-bit integer (4 bytes)
    Long = 4,

    /// Two LONGs: numerator and denominator (8 bytes)
    Rational = 5,

    /// Signed 8-bit integer (1 byte)
    SByte = 6,

    /// Undefined byte data (1 byte per element)
    Undefined = 7,

    /// Signed 16-bit integer (2 bytes)
    SShort = 8,

    /// Signed 32-bit integer (4 bytes)
    SLong = 9,

    /// Two SLONGs (8 bytes)
    SRational = 10,

    /// IEEE single precision (4 bytes)
    Float = 11,

    /// IEEE double precision (8 bytes)
    Double = 12,

    /// 32-bit IFD offset (4 bytes)
    Ifd = 13,

    /// Unsigned 64-bit integer (8 bytes) - BigTIFF only
    Long8 = 16,

    /// Signed 64-bit integer (8 bytes) - BigTIFF only
    SLong8 = 17,

    /// 64-bit IFD offset (8 bytes) - BigTIFF only
    Ifd8 = 18,
}

impl FieldType {
    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float | FieldType::Ifd => 4,
            FieldType::Rational
            | FieldType::SRational
            | FieldType::Double
            | FieldType::Long8
            | FieldType::SLong8
            | FieldType::Ifd8 => 8,
        }
    }

    /// Create a FieldType from its numeric value.
    ///
    /// Returns `None` for unknown type values.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            13 => Some(FieldType::Ifd),
            16 => Some(FieldType::Long8),
            17 => Some(FieldType::SLong8),
            18 => Some(FieldType::Ifd8),
            _ => None,
        }
    }

    /// Get the numeric type value.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Maximum bytes that can be stored inline in a classic TIFF IFD entry.
    ///
    /// In classic TIFF, the value/offset field is 4 bytes.
    pub const INLINE_THRESHOLD_TIFF: usize = 4;

    /// Maximum bytes that can be stored inline in a BigTIFF IFD entry.
    ///
    /// In BigTIFF, the value/offset field is 8 bytes.
    pub const INLINE_THRESHOLD_BIGTIFF: usize = 8;

    /// Check if a value with this type and count fits inline in a TIFF entry.
    ///
    /// # Arguments
    /// * `count` - Number of values
    /// * `is_bigtiff` - Whether this is a BigTIFF file
    ///
    /// # Returns
    /// `true` if the total value size fits in the inline value field.
    #[inline]
    pub fn fits_inline(self, count: u64, is_bigtiff: bool) -> bool {
        let total_size = (self.size_in_bytes() as u64).saturating_mul(count);
        let threshold = if is_bigtiff {
            Self::INLINE_THRESHOLD_BIGTIFF as u64
        } else {
            Self::INLINE_THRESHOLD_TIFF as u64
        };
        total_size <= threshold
    }
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// TIFF tag IDs the editor reads or reports on.
///
/// Only ImageDescription is ever rewritten. The image-data tags are listed
/// so the patcher can report which pixel pointers it left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    /// Image width in pixels
    ImageWidth = 256,

    /// Image height (length) in pixels
    ImageLength = 257,

    /// Description string (holds the OME-XML document in OME-TIFF)
    ImageDescription = 270,

    /// Byte offsets of strips
    StripOffsets = 273,

    /// Byte counts of strips
    StripByteCounts = 279,

    /// Byte offsets of each tile in the file
    TileOffsets = 324,

    /// Byte counts of each tile
    TileByteCounts = 325,

    /// Offsets to child IFDs (OME-TIFF sub-resolutions)
    SubIfds = 330,
}

impl TiffTag {
    /// Create a TiffTag from its numeric value.
    ///
    /// Returns `None` for unrecognized tags. Unknown tags are not an error;
    /// they are carried through a patch byte-for-byte.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            256 => Some(TiffTag::ImageWidth),
            257 => Some(TiffTag::ImageLength),
            270 => Some(TiffTag::ImageDescription),
            273 => Some(TiffTag::StripOffsets),
            279 => Some(TiffTag::StripByteCounts),
            324 => Some(TiffTag::TileOffsets),
            325 => Some(TiffTag::TileByteCounts),
            330 => Some(TiffTag::SubIfds),
            _ => None,
        }
    }

    /// Get the numeric tag ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether the tag's value holds file offsets into pixel data or other IFDs.
    pub const fn holds_data_offsets(self) -> bool {
        matches!(
            self,
            TiffTag::StripOffsets | TiffTag::TileOffsets | TiffTag::SubIfds
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
