//! TIFF header and structure parsing.
//!
//! This module handles parsing of TIFF and BigTIFF file headers and IFDs,
//! and the inverse encoding the patcher needs to write entries back.
//!
//! # TIFF Header Structure
//!
//! ## Classic TIFF (8 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (42 = 0x002A)
//! Bytes 4-7: Offset to first IFD (4 bytes)
//! ```
//!
//! ## BigTIFF (16 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (43 = 0x002B)
//! Bytes 4-5: Offset byte size (must be 8)
//! Bytes 6-7: Reserved (must be 0)
//! Bytes 8-15: Offset to first IFD (8 bytes)
//! ```
//!
//! # IFD Structure
//!
//! ```text
//! entry count      (2 bytes classic, 8 bytes BigTIFF)
//! entries          (12 bytes classic, 20 bytes BigTIFF, each)
//!   tag            (2)
//!   field type     (2)
//!   count          (4 classic, 8 BigTIFF)
//!   value/offset   (4 classic, 8 BigTIFF)
//! next IFD offset  (4 classic, 8 BigTIFF)
//! ```

use std::collections::HashMap;

use crate::error::TiffError;
use crate::io::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le, RangeReader,
};

use super::tags::{FieldType, TiffTag};

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Version number for classic TIFF
const VERSION_TIFF: u16 = 42;

/// Version number for BigTIFF
const VERSION_BIGTIFF: u16 = 43;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of BigTIFF header in bytes
pub const BIGTIFF_HEADER_SIZE: usize = 16;

/// Upper bound on entries in one BigTIFF IFD (classic TIFF is capped by its u16 count)
const MAX_IFD_ENTRIES: u64 = 1 << 20;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
///
/// TIFF files declare their byte order in the first two bytes of the header.
/// All multi-byte values in the file must be read and written in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from a byte slice using this byte order.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    /// Read a u32 from a byte slice using this byte order.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }

    /// Read a u64 from a byte slice using this byte order.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => read_u64_le(bytes),
            ByteOrder::BigEndian => read_u64_be(bytes),
        }
    }

    /// Encode a u16 in this byte order.
    #[inline]
    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }

    /// Encode a u32 in this byte order.
    #[inline]
    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }

    /// Encode a u64 in this byte order.
    #[inline]
    pub fn u64_bytes(self, value: u64) -> [u8; 8] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
///
/// Contains the essential information needed to begin parsing IFDs:
/// - Byte order for reading all subsequent values
/// - Whether this is classic TIFF or BigTIFF (affects entry sizes and offset widths)
/// - Location of the first IFD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Whether this is a BigTIFF file (64-bit offsets)
    pub is_bigtiff: bool,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse a TIFF header from raw bytes.
    ///
    /// The input must contain at least 8 bytes for classic TIFF or 16 bytes for BigTIFF.
    ///
    /// # Errors
    /// - `InvalidMagic` if byte order bytes are not II or MM
    /// - `InvalidVersion` if version is not 42 or 43
    /// - `InvalidBigTiffOffsetSize` if BigTIFF offset size is not 8
    /// - `FileTooSmall` if there aren't enough bytes for the header
    /// - `InvalidIfdOffset` if the first IFD offset is outside the file
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        // Read as little-endian because we're checking for specific byte patterns
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let version = byte_order.read_u16(&bytes[2..4]);

        let (is_bigtiff, first_ifd_offset) = match version {
            VERSION_TIFF => (false, byte_order.read_u32(&bytes[4..8]) as u64),
            VERSION_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(TiffError::FileTooSmall {
                        required: BIGTIFF_HEADER_SIZE as u64,
                        actual: bytes.len() as u64,
                    });
                }

                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
                }

                // Bytes 6-7 are reserved; not strictly checked
                (true, byte_order.read_u64(&bytes[8..16]))
            }
            _ => return Err(TiffError::InvalidVersion(version)),
        };

        if first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Read and parse the header at the start of `reader`.
    pub fn read<R: RangeReader>(reader: &R) -> Result<Self, TiffError> {
        let bytes = reader.read_at_most(0, BIGTIFF_HEADER_SIZE)?;
        Self::parse(&bytes, reader.size())
    }

    /// Size of the header in bytes.
    #[inline]
    pub const fn header_size(&self) -> usize {
        if self.is_bigtiff {
            BIGTIFF_HEADER_SIZE
        } else {
            TIFF_HEADER_SIZE
        }
    }

    /// File position of the first-IFD offset field inside the header.
    #[inline]
    pub const fn first_ifd_pointer_position(&self) -> u64 {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Size of an IFD entry in bytes.
    ///
    /// Classic TIFF: 12 bytes (2 tag + 2 type + 4 count + 4 value/offset)
    /// BigTIFF: 20 bytes (2 tag + 2 type + 8 count + 8 value/offset)
    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    /// Size of the entry count field at the start of an IFD.
    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Size of the next IFD offset field at the end of an IFD.
    #[inline]
    pub const fn ifd_next_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Size of the count field in an IFD entry.
    #[inline]
    pub const fn entry_count_field_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Size of the value/offset field in an IFD entry.
    ///
    /// This determines the inline value threshold:
    /// Classic TIFF: 4 bytes
    /// BigTIFF: 8 bytes
    #[inline]
    pub const fn value_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Largest file offset this header's format can address.
    #[inline]
    pub const fn max_offset(&self) -> u64 {
        if self.is_bigtiff {
            u64::MAX
        } else {
            u32::MAX as u64
        }
    }

    /// Encode an offset or count in the width of this format's value field.
    ///
    /// Callers must check `value <= self.max_offset()` first.
    pub fn encode_offset(&self, value: u64) -> Vec<u8> {
        if self.is_bigtiff {
            self.byte_order.u64_bytes(value).to_vec()
        } else {
            self.byte_order.u32_bytes(value as u32).to_vec()
        }
    }

    /// Decode an offset or count field of this format's width.
    pub fn decode_offset(&self, bytes: &[u8]) -> u64 {
        if self.is_bigtiff {
            self.byte_order.read_u64(bytes)
        } else {
            self.byte_order.read_u32(bytes) as u64
        }
    }
}

// =============================================================================
// IfdEntry
// =============================================================================

/// A single entry of an Image File Directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    /// Tag identifier
    pub tag_id: u16,

    /// Decoded field type, `None` when the type value is unknown
    pub field_type: Option<FieldType>,

    /// Field type exactly as stored in the file
    pub field_type_raw: u16,

    /// Number of values
    pub count: u64,

    /// Raw value/offset field (4 bytes classic, 8 bytes BigTIFF)
    pub value_offset_bytes: Vec<u8>,

    /// Whether the value is stored in `value_offset_bytes` itself
    pub is_inline: bool,
}

impl IfdEntry {
    /// Parse one entry from exactly `header.ifd_entry_size()` bytes.
    pub fn parse(bytes: &[u8], header: &TiffHeader) -> Self {
        let byte_order = header.byte_order;
        let tag_id = byte_order.read_u16(&bytes[0..2]);
        let field_type_raw = byte_order.read_u16(&bytes[2..4]);
        let field_type = FieldType::from_u16(field_type_raw);

        let count_end = 4 + header.entry_count_field_size();
        let count = header.decode_offset(&bytes[4..count_end]);
        let value_offset_bytes = bytes[count_end..count_end + header.value_offset_size()].to_vec();

        let is_inline = field_type
            .map(|ft| ft.fits_inline(count, header.is_bigtiff))
            .unwrap_or(false);

        Self {
            tag_id,
            field_type,
            field_type_raw,
            count,
            value_offset_bytes,
            is_inline,
        }
    }

    /// Encode the entry back into its on-disk form.
    pub fn encode(&self, header: &TiffHeader) -> Vec<u8> {
        let byte_order = header.byte_order;
        let mut bytes = Vec::with_capacity(header.ifd_entry_size());
        bytes.extend_from_slice(&byte_order.u16_bytes(self.tag_id));
        bytes.extend_from_slice(&byte_order.u16_bytes(self.field_type_raw));
        bytes.extend_from_slice(&header.encode_offset(self.count));
        bytes.extend_from_slice(&self.value_offset_bytes);
        bytes
    }

    /// Total size of the entry's value in bytes, `None` for unknown field types.
    pub fn value_byte_size(&self) -> Option<u64> {
        self.field_type
            .map(|ft| (ft.size_in_bytes() as u64).saturating_mul(self.count))
    }

    /// File offset of an out-of-line value.
    ///
    /// Meaningless for inline entries.
    pub fn value_offset(&self, header: &TiffHeader) -> u64 {
        header.decode_offset(&self.value_offset_bytes)
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// A parsed Image File Directory together with its location in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ifd {
    /// File offset of the IFD's entry count field
    pub offset: u64,

    /// Entries in stored order
    pub entries: Vec<IfdEntry>,

    /// Tag id to index into `entries`
    pub entries_by_tag: HashMap<u16, usize>,

    /// Offset of the next IFD in the chain (0 = last)
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// Total on-disk size of an IFD with `entry_count` entries.
    pub fn calculate_size(entry_count: u64, header: &TiffHeader) -> usize {
        header.ifd_count_size()
            + entry_count as usize * header.ifd_entry_size()
            + header.ifd_next_offset_size()
    }

    /// Parse an IFD from bytes starting at its entry count field.
    pub fn parse(bytes: &[u8], offset: u64, header: &TiffHeader) -> Result<Self, TiffError> {
        let count_size = header.ifd_count_size();
        if bytes.len() < count_size {
            return Err(TiffError::InvalidIfdOffset(offset));
        }

        let entry_count = if header.is_bigtiff {
            header.byte_order.read_u64(&bytes[..count_size])
        } else {
            header.byte_order.read_u16(&bytes[..count_size]) as u64
        };

        let total = Self::calculate_size(entry_count, header);
        if bytes.len() < total {
            return Err(TiffError::InvalidTagValue {
                tag: "IFD",
                message: format!(
                    "directory at {} declares {} entries but only {} bytes are available",
                    offset,
                    entry_count,
                    bytes.len()
                ),
            });
        }

        let entry_size = header.ifd_entry_size();
        let mut entries = Vec::with_capacity(entry_count as usize);
        let mut entries_by_tag = HashMap::with_capacity(entry_count as usize);

        for i in 0..entry_count as usize {
            let start = count_size + i * entry_size;
            let entry = IfdEntry::parse(&bytes[start..start + entry_size], header);
            // First occurrence wins for duplicated tags
            entries_by_tag.entry(entry.tag_id).or_insert(i);
            entries.push(entry);
        }

        let next_start = count_size + entry_count as usize * entry_size;
        let next_ifd_offset = header.decode_offset(&bytes[next_start..total]);

        Ok(Self {
            offset,
            entries,
            entries_by_tag,
            next_ifd_offset,
        })
    }

    /// Read the IFD located at `offset`.
    pub fn read<R: RangeReader>(
        reader: &R,
        offset: u64,
        header: &TiffHeader,
    ) -> Result<Self, TiffError> {
        if offset < header.header_size() as u64 || offset >= reader.size() {
            return Err(TiffError::InvalidIfdOffset(offset));
        }

        // First, read just enough to get the entry count
        let count_bytes = reader.read_exact_at(offset, header.ifd_count_size())?;
        let entry_count = if header.is_bigtiff {
            header.byte_order.read_u64(&count_bytes)
        } else {
            header.byte_order.read_u16(&count_bytes) as u64
        };

        if entry_count > MAX_IFD_ENTRIES {
            return Err(TiffError::InvalidTagValue {
                tag: "IFD",
                message: format!("implausible entry count {}", entry_count),
            });
        }

        // Now read the full IFD
        let ifd_size = Self::calculate_size(entry_count, header);
        let ifd_bytes = reader.read_exact_at(offset, ifd_size)?;
        Self::parse(&ifd_bytes, offset, header)
    }

    /// Read the first IFD in the file.
    pub fn read_first<R: RangeReader>(reader: &R, header: &TiffHeader) -> Result<Self, TiffError> {
        Self::read(reader, header.first_ifd_offset, header)
    }

    /// Look up an entry by raw tag id.
    pub fn get_entry(&self, tag_id: u16) -> Option<&IfdEntry> {
        self.entries_by_tag.get(&tag_id).map(|&i| &self.entries[i])
    }

    /// Look up an entry by known tag.
    pub fn get_entry_by_tag(&self, tag: TiffTag) -> Option<&IfdEntry> {
        self.get_entry(tag.as_u16())
    }

    /// Index of the entry with `tag_id` in `entries`.
    pub fn entry_index(&self, tag_id: u16) -> Option<usize> {
        self.entries_by_tag.get(&tag_id).copied()
    }

    /// File position of the entry at `index`.
    pub fn entry_position(&self, index: usize, header: &TiffHeader) -> u64 {
        self.offset + header.ifd_count_size() as u64 + (index * header.ifd_entry_size()) as u64
    }

    /// Encode the whole directory, entries in stored order.
    pub fn encode(&self, header: &TiffHeader) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::calculate_size(self.entries.len() as u64, header));

        if header.is_bigtiff {
            bytes.extend_from_slice(&header.byte_order.u64_bytes(self.entries.len() as u64));
        } else {
            bytes.extend_from_slice(&header.byte_order.u16_bytes(self.entries.len() as u16));
        }
        for entry in &self.entries {
            bytes.extend_from_slice(&entry.encode(header));
        }
        bytes.extend_from_slice(&header.encode_offset(self.next_ifd_offset));

        bytes
    }

    /// Insert an entry keeping entries sorted by ascending tag id.
    ///
    /// Any existing entries with the same tag are kept; the new entry lands
    /// after them.
    pub fn insert_entry(&mut self, entry: IfdEntry) {
        let index = self
            .entries
            .iter()
            .position(|e| e.tag_id > entry.tag_id)
            .unwrap_or(self.entries.len());
        self.entries.insert(index, entry);

        self.entries_by_tag.clear();
        for (i, e) in self.entries.iter().enumerate() {
            self.entries_by_tag.entry(e.tag_id).or_insert(i);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
