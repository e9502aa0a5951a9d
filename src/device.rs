//! A seekable, positionally-readable byte source standing in for a block device.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::pattern::INBLOCK_SIZE;

/// A read-only handle on the device being sampled.
///
/// Each worker opens its own handle so positional reads never contend on a
/// shared file cursor; `read_at` never perturbs it, by construction.
pub struct Device {
    file: File,
    size: u64,
}

impl Device {
    /// Opens `path` read-only and measures its size by seeking to the end.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Device { file, size })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn num_chunks(&self) -> u64 {
        self.size / INBLOCK_SIZE as u64
    }

    /// Reads exactly `INBLOCK_SIZE` bytes at `offset`. Short reads past the
    /// end of the device are zero-padded rather than treated as an error, so
    /// a worker running off the end of the device just sees zero blocks.
    pub fn read_block(&self, offset: u64, buf: &mut [u8; INBLOCK_SIZE]) -> io::Result<()> {
        match self.file.read_at(buf, offset) {
            Ok(n) if n == buf.len() => Ok(()),
            Ok(n) => {
                buf[n..].fill(0);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                buf.fill(0);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Clones the underlying handle for use from another worker thread.
    pub fn try_clone(&self) -> io::Result<Device> {
        Ok(Device {
            file: self.file.try_clone()?,
            size: self.size,
        })
    }
}
