//! File-backed shared memory segments.
//!
//! Every cross-process primitive in this crate sits on top of a named,
//! fixed-size mapping: the segment is identified by a filesystem path so
//! that two cooperating processes can attach to the same bytes by agreeing
//! on the name alone. The unsafe mapping surface is kept inside this module;
//! callers only see pointers and lengths.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};

use crate::{TransportError, TransportResult};

/// A named, fixed-size, read-write memory mapping shared between processes.
///
/// Opening the same path from two processes attaches both to the same
/// physical bytes. The first opener creates and zero-fills the backing
/// file; later openers attach to whatever is already there.
#[derive(Debug)]
pub struct SharedSegment {
    path: PathBuf,
    map: MmapMut,
    len: usize,
}

impl SharedSegment {
    /// Creates or attaches to the segment at `path`, sized to `len` bytes.
    pub fn open(path: impl AsRef<Path>, len: usize) -> TransportResult<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(TransportError::InvalidArgument("empty segment path"));
        }
        if len == 0 {
            return Err(TransportError::InvalidArgument("zero-length segment"));
        }

        let file = Self::backing_file(path, len as u64)
            .map_err(|_| Self::exhausted(path))?;

        // SAFETY: the mapping stays valid for the lifetime of `map`; the file
        // was just sized to cover the full `len` bytes.
        let map = unsafe { MmapOptions::new().len(len).map_mut(&file) }
            .map_err(|_| Self::exhausted(path))?;

        Ok(Self {
            path: path.to_path_buf(),
            map,
            len,
        })
    }

    fn backing_file(path: &Path, len: u64) -> io::Result<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        // set_len zero-fills on first creation and is a no-op on reattach
        // when the size already matches.
        if file.metadata()?.len() != len {
            file.set_len(len)?;
        }
        Ok(file)
    }

    fn exhausted(path: &Path) -> TransportError {
        TransportError::ResourceExhausted {
            resource: "shared segment",
            path: path.to_path_buf(),
        }
    }

    /// Number of bytes covered by the mapping.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true when the segment maps zero bytes (never constructed).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow the segment as a const pointer.
    pub fn as_ptr(&self) -> *const u8 {
        self.map.as_ptr()
    }

    /// Borrow the segment as a mut pointer.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.map.as_mut_ptr()
    }

    /// Removes the backing file so no further process can attach.
    ///
    /// Existing mappings (this one included) stay valid until dropped, the
    /// same way a file marked for deletion survives until the last close.
    /// Idempotent: a missing file is not an error.
    pub fn unlink(&self) {
        let _ = fs::remove_file(&self.path);
    }
}
