mod patch_file;
mod range_reader;

pub use patch_file::PatchFile;
pub use range_reader::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le, RangeReader,
};
