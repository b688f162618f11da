//! Scoped read/write handle for patching a container file in place.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use super::range_reader::{check_range, RangeReader};
use crate::error::IoError;

/// Alignment applied to data appended at end of file.
///
/// TIFF readers expect out-of-line values and IFDs to start on a word
/// boundary.
const APPEND_ALIGNMENT: u64 = 2;

/// A file opened for combined random-access reads and writes.
///
/// The handle is a guard: dropping it closes the file on every exit path.
/// Call [`PatchFile::finish`] on success so pending data is flushed and
/// synced before the caller reports the edit as complete.
pub struct PatchFile {
    file: File,
    size: u64,
    identifier: String,
    finished: bool,
}

impl PatchFile {
    /// Open an existing file for reading and writing.
    pub fn open(path: &Path) -> Result<Self, IoError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            file,
            size,
            identifier: path.display().to_string(),
            finished: false,
        })
    }

    /// Open an existing file for reading only.
    ///
    /// Writes through a read-only handle fail with an I/O error.
    pub fn open_read(path: &Path) -> Result<Self, IoError> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            file,
            size,
            identifier: path.display().to_string(),
            finished: true,
        })
    }

    /// Overwrite bytes at `offset`. The range must lie inside the file.
    pub fn write_all_at(&mut self, offset: u64, data: &[u8]) -> Result<(), IoError> {
        check_range(offset, data.len(), self.size)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        Ok(())
    }

    /// Append `data` at the end of the file, padding to a word boundary first.
    ///
    /// Returns the offset at which `data` starts.
    pub fn append_aligned(&mut self, data: &[u8]) -> Result<u64, IoError> {
        let padding = (APPEND_ALIGNMENT - self.size % APPEND_ALIGNMENT) % APPEND_ALIGNMENT;
        let offset = self.size + padding;

        self.file.seek(SeekFrom::Start(self.size))?;
        if padding > 0 {
            self.file.write_all(&[0u8; APPEND_ALIGNMENT as usize][..padding as usize])?;
        }
        self.file.write_all(data)?;
        self.size = offset + data.len() as u64;

        Ok(offset)
    }

    /// The offset that [`PatchFile::append_aligned`] would return next.
    pub fn next_append_offset(&self) -> u64 {
        let padding = (APPEND_ALIGNMENT - self.size % APPEND_ALIGNMENT) % APPEND_ALIGNMENT;
        self.size + padding
    }

    /// Flush and sync all writes, then release the handle.
    pub fn finish(mut self) -> Result<(), IoError> {
        self.file.flush()?;
        self.file.sync_all()?;
        self.finished = true;
        Ok(())
    }
}

impl RangeReader for PatchFile {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.size)?;

        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl Drop for PatchFile {
    fn drop(&mut self) {
        if !self.finished {
            debug!(file = %self.identifier, "patch handle released without finish");
        }
    }
}
