//! In-place rewrite of the ImageDescription tag.
//!
//! OME-TIFF stores its OME-XML document in the ImageDescription (tag 270) of
//! the first IFD. Rewriting it must never move pixel data or any other tag's
//! value, because every strip, tile and sub-IFD is addressed by absolute file
//! offset. Three cases are handled:
//!
//! - **In place**: the new text (plus its NUL) fits in the bytes already
//!   allocated to the tag. The bytes are overwritten and the rest of the
//!   allocation is zeroed. Nothing else in the file changes, not even the
//!   IFD entry.
//! - **Relocated**: the new text is longer. It is appended at the end of the
//!   file and only the tag's own IFD entry (type, count, offset) is rewritten.
//! - **Inserted**: there is no ImageDescription yet. A copy of the first IFD
//!   with the extra entry is appended at the end of the file, followed by the
//!   text, and the header is repointed at the copy. All other entries are
//!   copied byte-for-byte, so their values and offsets stay valid.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{IoError, PatchError, TiffError};
use crate::io::{PatchFile, RangeReader};

use super::parser::{Ifd, IfdEntry, TiffHeader};
use super::tags::{FieldType, TiffTag};
use super::values::ValueReader;

// =============================================================================
// PatchOutcome
// =============================================================================

/// Which rewrite strategy a patch used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Text written over the existing allocation at `value_offset`
    InPlace { value_offset: u64, allocated: u64 },

    /// Text moved to `value_offset` and the IFD entry repointed
    Relocated { value_offset: u64 },

    /// A new first IFD was written at `ifd_offset` with the tag added
    Inserted { ifd_offset: u64, value_offset: u64 },
}

// =============================================================================
// Public API
// =============================================================================

/// Replace the ImageDescription of the first IFD of `path` with `text`.
///
/// The file is opened once for random-access read/write and flushed before
/// returning. On error, bytes already written are not rolled back.
///
/// # Errors
/// - `NoSuchFile` if `path` does not exist
/// - `NotATiff` if the file does not start with a TIFF/BigTIFF header
/// - `OffsetOverflow` if a classic TIFF would need an offset past 4 GiB
/// - `Tiff` if the first IFD is damaged
/// - `Io` for read/write failures
pub fn overwrite_description(
    path: impl AsRef<Path>,
    text: &str,
) -> Result<PatchOutcome, PatchError> {
    let path = path.as_ref();
    let mut file = open_existing(path, PatchFile::open)?;

    let outcome = patch_description(&mut file, text)?;
    file.finish()?;

    info!(
        file = %path.display(),
        bytes = text.len(),
        ?outcome,
        "ImageDescription rewritten"
    );

    Ok(outcome)
}

/// Read the ImageDescription of the first IFD of `path`.
///
/// Returns `Ok(None)` when the tag is absent. The text ends at the first NUL.
pub fn read_description(path: impl AsRef<Path>) -> Result<Option<String>, PatchError> {
    let path = path.as_ref();
    let file = open_existing(path, PatchFile::open_read)?;

    let header = TiffHeader::read(&file)?;
    let ifd = Ifd::read_first(&file, &header)?;

    match ifd.get_entry_by_tag(TiffTag::ImageDescription) {
        Some(entry) => {
            let values = ValueReader::new(&file, &header);
            Ok(Some(values.read_string(entry)?))
        }
        None => Ok(None),
    }
}

/// Apply the description rewrite to an already opened file.
///
/// The caller owns the handle and decides when to finish it.
pub fn patch_description(file: &mut PatchFile, text: &str) -> Result<PatchOutcome, PatchError> {
    let header = TiffHeader::read(&*file)?;
    let ifd = Ifd::read_first(&*file, &header)?;
    let encoded = encode_description(text);

    debug!(
        file = file.identifier(),
        bigtiff = header.is_bigtiff,
        entries = ifd.entries.len(),
        new_len = encoded.len(),
        "patching first IFD"
    );

    match ifd.entry_index(TiffTag::ImageDescription.as_u16()) {
        Some(index) => {
            let entry = &ifd.entries[index];
            let allocated = entry.value_byte_size().unwrap_or(0);

            if !entry.is_inline {
                let start = entry.value_offset(&header);
                if start.checked_add(allocated).map_or(true, |end| end > file.size()) {
                    return Err(PatchError::Tiff(TiffError::InvalidTagValue {
                        tag: "ImageDescription",
                        message: format!(
                            "{} bytes at offset {} run past end of file ({} bytes)",
                            allocated,
                            start,
                            file.size()
                        ),
                    }));
                }
            }

            if encoded.len() as u64 <= allocated {
                write_in_place(file, &header, &ifd, index, &encoded, allocated)
            } else {
                relocate(file, &header, &ifd, index, &encoded)
            }
        }
        None => insert(file, &header, &ifd, &encoded),
    }
}

// =============================================================================
// Strategies
// =============================================================================

fn write_in_place(
    file: &mut PatchFile,
    header: &TiffHeader,
    ifd: &Ifd,
    index: usize,
    encoded: &[u8],
    allocated: u64,
) -> Result<PatchOutcome, PatchError> {
    let entry = &ifd.entries[index];
    let value_offset = if entry.is_inline {
        value_field_position(ifd, index, header)
    } else {
        entry.value_offset(header)
    };

    let mut block = encoded.to_vec();
    block.resize(allocated as usize, 0);
    file.write_all_at(value_offset, &block)?;

    debug!(
        value_offset,
        allocated,
        inline = entry.is_inline,
        "description written in place"
    );

    Ok(PatchOutcome::InPlace {
        value_offset,
        allocated,
    })
}

fn relocate(
    file: &mut PatchFile,
    header: &TiffHeader,
    ifd: &Ifd,
    index: usize,
    encoded: &[u8],
) -> Result<PatchOutcome, PatchError> {
    let entry_position = ifd.entry_position(index, header);

    let (replacement, value_offset) = if encoded.len() <= header.value_offset_size() {
        (
            ascii_entry(encoded, inline_value(encoded, header), header),
            value_field_position(ifd, index, header),
        )
    } else {
        let value_offset = file.next_append_offset();
        check_addressable(header, value_offset + encoded.len() as u64)?;

        let appended_at = file.append_aligned(encoded)?;
        debug_assert_eq!(appended_at, value_offset);
        (
            ascii_entry(encoded, header.encode_offset(value_offset), header),
            value_offset,
        )
    };

    file.write_all_at(entry_position, &replacement.encode(header))?;

    debug!(entry_position, value_offset, "description relocated");

    Ok(PatchOutcome::Relocated { value_offset })
}

fn insert(
    file: &mut PatchFile,
    header: &TiffHeader,
    ifd: &Ifd,
    encoded: &[u8],
) -> Result<PatchOutcome, PatchError> {
    if !header.is_bigtiff && ifd.entries.len() >= u16::MAX as usize {
        return Err(TiffError::InvalidTagValue {
            tag: "ImageDescription",
            message: format!("first IFD already holds {} entries", ifd.entries.len()),
        }
        .into());
    }

    let ifd_offset = file.next_append_offset();
    let ifd_size = Ifd::calculate_size(ifd.entries.len() as u64 + 1, header) as u64;

    let mut relocated = ifd.clone();
    relocated.offset = ifd_offset;

    let inline = encoded.len() <= header.value_offset_size();
    let value_offset = if inline {
        // The value field sits in the entry itself; its position is known
        // only after insertion, so fill it in below.
        0
    } else {
        ifd_offset + ifd_size
    };

    let value_field = if inline {
        inline_value(encoded, header)
    } else {
        header.encode_offset(value_offset)
    };
    relocated.insert_entry(ascii_entry(encoded, value_field, header));

    let mut block = relocated.encode(header);
    if !inline {
        block.extend_from_slice(encoded);
    }
    check_addressable(header, ifd_offset + block.len() as u64)?;

    let appended_at = file.append_aligned(&block)?;
    debug_assert_eq!(appended_at, ifd_offset);

    file.write_all_at(
        header.first_ifd_pointer_position(),
        &header.encode_offset(ifd_offset),
    )?;

    let value_offset = if inline {
        let index = relocated
            .entry_index(TiffTag::ImageDescription.as_u16())
            .unwrap_or_default();
        value_field_position(&relocated, index, header)
    } else {
        value_offset
    };

    let offset_tags = ifd
        .entries
        .iter()
        .filter(|e| TiffTag::from_u16(e.tag_id).is_some_and(|t| t.holds_data_offsets()))
        .count();
    debug!(
        old_ifd_offset = ifd.offset,
        ifd_offset,
        value_offset,
        offset_tags,
        "description inserted into relocated IFD"
    );

    Ok(PatchOutcome::Inserted {
        ifd_offset,
        value_offset,
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// Open `path`, mapping a missing file to `NoSuchFile`.
fn open_existing(
    path: &Path,
    open: fn(&Path) -> Result<PatchFile, IoError>,
) -> Result<PatchFile, PatchError> {
    open(path).map_err(|err| match err {
        IoError::Fs(e) if e.kind() == ErrorKind::NotFound => {
            PatchError::NoSuchFile(path.to_path_buf())
        }
        other => PatchError::Io(other),
    })
}

/// UTF-8 bytes of the description with the NUL terminator TIFF requires.
fn encode_description(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + 1);
    bytes.extend_from_slice(text.as_bytes());
    bytes.push(0);
    bytes
}

/// Zero-padded inline value field holding `encoded`.
fn inline_value(encoded: &[u8], header: &TiffHeader) -> Vec<u8> {
    let mut field = encoded.to_vec();
    field.resize(header.value_offset_size(), 0);
    field
}

fn ascii_entry(encoded: &[u8], value_offset_bytes: Vec<u8>, header: &TiffHeader) -> IfdEntry {
    IfdEntry {
        tag_id: TiffTag::ImageDescription.as_u16(),
        field_type: Some(FieldType::Ascii),
        field_type_raw: FieldType::Ascii.as_u16(),
        count: encoded.len() as u64,
        is_inline: FieldType::Ascii.fits_inline(encoded.len() as u64, header.is_bigtiff),
        value_offset_bytes,
    }
}

/// File position of the value/offset field of entry `index`.
fn value_field_position(ifd: &Ifd, index: usize, header: &TiffHeader) -> u64 {
    ifd.entry_position(index, header) + 4 + header.entry_count_field_size() as u64
}

fn check_addressable(header: &TiffHeader, end: u64) -> Result<(), PatchError> {
    if end > header.max_offset() {
        return Err(PatchError::OffsetOverflow(end));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
