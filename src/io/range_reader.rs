use bytes::Bytes;

use crate::error::IoError;

/// Trait for reading byte ranges from a container file.
///
/// This abstraction lets the TIFF parser walk headers and IFDs without
/// loading the whole file, which matters for multi-gigabyte OME-TIFFs.
pub trait RangeReader {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns an error if the range is out of bounds or if the read fails.
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Get the total size of the resource in bytes.
    fn size(&self) -> u64;

    /// Get a unique identifier for this resource (for logging).
    fn identifier(&self) -> &str;

    /// Read up to `len` bytes starting at `offset`, truncated at end of file.
    fn read_at_most(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        if offset >= self.size() {
            return Ok(Bytes::new());
        }
        let available = self.size().saturating_sub(offset).min(len as u64) as usize;
        self.read_exact_at(offset, available)
    }
}

/// Check that `offset..offset + len` lies within a resource of `size` bytes.
pub(crate) fn check_range(offset: u64, len: usize, size: u64) -> Result<(), IoError> {
    match offset.checked_add(len as u64) {
        Some(end) if end <= size => Ok(()),
        _ => Err(IoError::RangeOutOfBounds {
            offset,
            requested: len as u64,
            size,
        }),
    }
}

// =============================================================================
// Endian Helper Functions
// =============================================================================
//
// TIFF files can be either little-endian or big-endian, determined by the
// magic bytes at the start of the file. These helpers are used extensively
// by the TIFF parser.

/// Read a little-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

/// Read a big-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_be(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Read a little-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a big-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_be(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a little-endian u64 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 8 bytes.
#[inline]
pub fn read_u64_le(bytes: &[u8]) -> u64 {
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Read a big-endian u64 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 8 bytes.
#[inline]
pub fn read_u64_be(bytes: &[u8]) -> u64 {
    u64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}
