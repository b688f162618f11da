//! TIFF tag value reading.
//!
//! This module provides functionality to read tag values from TIFF files.
//! Values can be stored either inline in the IFD entry (for small values)
//! or at an offset in the file (for larger values like strings and arrays).

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, IfdEntry, TiffHeader};
use super::tags::FieldType;

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values from a TIFF file.
///
/// This struct combines a RangeReader with TIFF header information to
/// read values respecting the file's byte order and format.
pub struct ValueReader<'a, R: RangeReader> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader> ValueReader<'a, R> {
    /// Create a new ValueReader.
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    /// Read raw bytes for an IFD entry's value.
    ///
    /// For inline values, returns the bytes from the entry.
    /// For offset values, fetches the bytes from the file.
    pub fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.is_inline {
            Ok(Bytes::copy_from_slice(
                &entry.value_offset_bytes[..size as usize],
            ))
        } else {
            let offset = entry.value_offset(self.header);
            let len = usize::try_from(size).map_err(|_| TiffError::InvalidTagValue {
                tag: "unknown",
                message: format!("value of {} bytes is too large to read", size),
            })?;
            Ok(self.reader.read_exact_at(offset, len)?)
        }
    }

    /// Read an array of u64 values from an entry.
    ///
    /// Used for StripOffsets/TileOffsets; the whole array is fetched in one read.
    /// Handles Short, Long, and Long8 field types, converting all to u64.
    pub fn read_u64_array(&self, entry: &IfdEntry) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if !matches!(
            field_type,
            FieldType::Short | FieldType::Long | FieldType::Long8 | FieldType::Ifd | FieldType::Ifd8
        ) {
            return Err(TiffError::InvalidTagValue {
                tag: "unknown",
                message: format!(
                    "expected Short, Long, or Long8 for array, got {:?}",
                    field_type
                ),
            });
        }

        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let bytes = self.read_bytes(entry)?;
        Ok(parse_u64_array(
            &bytes,
            entry.count as usize,
            field_type,
            self.header.byte_order,
        ))
    }

    /// Read a string value from an entry (ASCII type).
    ///
    /// The string ends at the first NUL byte; any padding after it is
    /// dropped. Invalid UTF-8 is replaced rather than rejected, since
    /// writers occasionally put Latin-1 into ASCII tags.
    pub fn read_string(&self, entry: &IfdEntry) -> Result<String, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if !matches!(
            field_type,
            FieldType::Ascii | FieldType::Byte | FieldType::Undefined
        ) {
            return Err(TiffError::InvalidTagValue {
                tag: "unknown",
                message: format!("expected Ascii type for string, got {:?}", field_type),
            });
        }

        let bytes = self.read_bytes(entry)?;

        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let s = String::from_utf8_lossy(&bytes[..end]).into_owned();

        Ok(s)
    }
}

// =============================================================================
// Convenience functions for reading from bytes directly
// =============================================================================

/// Parse an array of u64 values from raw bytes.
///
/// Values that would run past the end of `bytes` are skipped.
pub fn parse_u64_array(
    bytes: &[u8],
    count: usize,
    field_type: FieldType,
    byte_order: ByteOrder,
) -> Vec<u64> {
    let width = field_type.size_in_bytes();
    let mut values = Vec::with_capacity(count);

    for i in 0..count {
        let offset = i * width;
        if offset + width > bytes.len() {
            break;
        }
        let value = match width {
            2 => byte_order.read_u16(&bytes[offset..]) as u64,
            4 => byte_order.read_u32(&bytes[offset..]) as u64,
            8 => byte_order.read_u64(&bytes[offset..]),
            _ => bytes[offset] as u64,
        };
        values.push(value);
    }

    values
}

// =============================================================================
// Tests
// =============================================================================
