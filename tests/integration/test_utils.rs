//! Test utilities for integration tests.
//!
//! Builders for small single-strip TIFF files, written byte by byte so tests
//! know exactly where every field lives.

use std::ops::Range;
use std::path::{Path, PathBuf};

use ome_meta_editor::format::tiff::{Ifd, TiffHeader, TiffTag, ValueReader};
use ome_meta_editor::io::PatchFile;

// =============================================================================
// TIFF Builder
// =============================================================================

#[derive(Clone, Copy, Debug)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

/// Image side length of built files; pixels are 8-bit grayscale.
pub const SIDE: u16 = 4;

/// A built file plus the locations tests care about.
pub struct TestTiff {
    pub bytes: Vec<u8>,
    pub strip_offset: u64,
    pub strip: Vec<u8>,
    /// Byte range of the description value, inline or out of line
    pub description_range: Option<Range<usize>>,
}

impl TestTiff {
    /// Write the file into `dir`.
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, &self.bytes).unwrap();
        path
    }
}

/// Builder for single-IFD, single-strip grayscale TIFF files.
pub struct TiffBuilder {
    byte_order: ByteOrderType,
    is_bigtiff: bool,
    description: Option<Vec<u8>>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            is_bigtiff: false,
            description: None,
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_bigtiff(mut self, is_bigtiff: bool) -> Self {
        self.is_bigtiff = is_bigtiff;
        self
    }

    /// Add an ImageDescription holding `text` plus a NUL terminator.
    pub fn with_description(mut self, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.description = Some(bytes);
        self
    }

    /// Build the file: header, strip, out-of-line description, then the IFD.
    pub fn build(self) -> TestTiff {
        let mut data = Vec::new();
        let offset_size = if self.is_bigtiff { 8 } else { 4 };

        match self.byte_order {
            ByteOrderType::LittleEndian => data.extend_from_slice(b"II"),
            ByteOrderType::BigEndian => data.extend_from_slice(b"MM"),
        }
        if self.is_bigtiff {
            self.write(&mut data, 43, 2);
            self.write(&mut data, 8, 2);
            self.write(&mut data, 0, 2);
        } else {
            self.write(&mut data, 42, 2);
        }
        let first_ifd_pos = data.len();
        self.write(&mut data, 0, offset_size);

        // Pixel strip
        let strip_offset = data.len() as u64;
        let strip: Vec<u8> = (0..(SIDE * SIDE) as u8).map(|i| i * 16 + 3).collect();
        data.extend_from_slice(&strip);

        // Out-of-line description
        let mut description_range = None;
        let mut description_value = 0u64;
        if let Some(ref desc) = self.description {
            if desc.len() > offset_size {
                let start = data.len();
                data.extend_from_slice(desc);
                if data.len() % 2 == 1 {
                    data.push(0);
                }
                description_range = Some(start..start + desc.len());
                description_value = start as u64;
            }
        }

        // IFD
        let ifd_offset = data.len() as u64;
        let mut entries: Vec<(u16, u16, u64, Option<u64>)> = vec![
            (256, 3, 1, Some(SIDE as u64)),                    // ImageWidth
            (257, 3, 1, Some(SIDE as u64)),                    // ImageLength
            (258, 3, 1, Some(8)),                              // BitsPerSample
            (259, 3, 1, Some(1)),                              // Compression = none
            (262, 3, 1, Some(1)),                              // MinIsBlack
            (273, 4, 1, Some(strip_offset)),                   // StripOffsets
            (277, 3, 1, Some(1)),                              // SamplesPerPixel
            (278, 3, 1, Some(SIDE as u64)),                    // RowsPerStrip
            (279, 4, 1, Some(strip.len() as u64)),             // StripByteCounts
        ];
        let inline_description = match self.description {
            Some(ref desc) if desc.len() <= offset_size => Some(desc.clone()),
            _ => None,
        };
        if let Some(ref desc) = self.description {
            let value = if inline_description.is_some() {
                None
            } else {
                Some(description_value)
            };
            entries.push((270, 2, desc.len() as u64, value));
        }
        entries.sort_by_key(|e| e.0);

        self.write(&mut data, entries.len() as u64, if self.is_bigtiff { 8 } else { 2 });
        for (tag, field_type, count, value) in entries {
            self.write(&mut data, tag as u64, 2);
            self.write(&mut data, field_type as u64, 2);
            self.write(&mut data, count, offset_size);

            match value {
                // Values and offsets are left-justified in the field
                Some(v) => {
                    let size = match field_type {
                        3 => 2,
                        4 => 4,
                        _ => offset_size,
                    };
                    self.write(&mut data, v, size);
                    data.extend(std::iter::repeat(0).take(offset_size - size));
                }
                None => {
                    let field_start = data.len();
                    let desc = inline_description.clone().unwrap_or_default();
                    data.extend_from_slice(&desc);
                    data.extend(std::iter::repeat(0).take(offset_size - desc.len()));
                    description_range = Some(field_start..field_start + desc.len());
                }
            }
        }
        self.write(&mut data, 0, offset_size);

        // Point the header at the IFD
        let mut pointer = Vec::new();
        self.write(&mut pointer, ifd_offset, offset_size);
        data[first_ifd_pos..first_ifd_pos + offset_size].copy_from_slice(&pointer);

        TestTiff {
            bytes: data,
            strip_offset,
            strip,
            description_range,
        }
    }

    fn write(&self, data: &mut Vec<u8>, value: u64, size: usize) {
        write_value(data, self.byte_order, value, size);
    }
}

impl Default for TiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn write_value(data: &mut Vec<u8>, byte_order: ByteOrderType, value: u64, size: usize) {
    match byte_order {
        ByteOrderType::LittleEndian => match size {
            2 => data.extend(&(value as u16).to_le_bytes()),
            4 => data.extend(&(value as u32).to_le_bytes()),
            8 => data.extend(&value.to_le_bytes()),
            _ => {}
        },
        ByteOrderType::BigEndian => match size {
            2 => data.extend(&(value as u16).to_be_bytes()),
            4 => data.extend(&(value as u32).to_be_bytes()),
            8 => data.extend(&value.to_be_bytes()),
            _ => {}
        },
    }
}

// =============================================================================
// Inspection Helpers
// =============================================================================

/// Read StripOffsets and StripByteCounts of the first IFD.
pub fn strip_layout(path: &Path) -> (Vec<u64>, Vec<u64>) {
    let file = PatchFile::open_read(path).unwrap();
    let header = TiffHeader::read(&file).unwrap();
    let ifd = Ifd::read_first(&file, &header).unwrap();
    let values = ValueReader::new(&file, &header);

    let offsets = ifd
        .get_entry_by_tag(TiffTag::StripOffsets)
        .map(|e| values.read_u64_array(e).unwrap())
        .unwrap();
    let counts = ifd
        .get_entry_by_tag(TiffTag::StripByteCounts)
        .map(|e| values.read_u64_array(e).unwrap())
        .unwrap();

    (offsets, counts)
}

/// Bytes that differ between two equally long buffers.
pub fn changed_positions(before: &[u8], after: &[u8]) -> Vec<usize> {
    assert_eq!(before.len(), after.len(), "file length changed");
    before
        .iter()
        .zip(after)
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(i, _)| i)
        .collect()
}

/// Encode a grayscale image as TIFF with the `image` crate.
pub fn encode_with_image_crate(width: u32, height: u32) -> (Vec<u8>, Vec<u8>) {
    let img = image::GrayImage::from_fn(width, height, |x, y| {
        image::Luma([((x * 7 + y * 13) % 256) as u8])
    });
    let pixels = img.as_raw().clone();

    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut buf, image::ImageFormat::Tiff)
        .unwrap();

    (buf.into_inner(), pixels)
}

/// Decode a TIFF file with the `image` crate and return its gray pixels.
pub fn decode_with_image_crate(path: &Path) -> Vec<u8> {
    let bytes = std::fs::read(path).unwrap();
    image::load_from_memory_with_format(&bytes, image::ImageFormat::Tiff)
        .unwrap()
        .to_luma8()
        .into_raw()
}
