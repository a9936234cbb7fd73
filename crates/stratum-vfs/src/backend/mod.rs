//! Concrete translators and file handles.
//!
//! - [`LocalTranslator`]: a directory tree on disk, mmap-capable handles
//! - [`MemoryTranslator`]: a volatile in-memory tree
//! - [`BufferFile`]: read-only handle over a static byte region, the input
//!   handed to archive formats by the embedded bootstrap
//!
//! Archive formats themselves live outside this crate and plug in through
//! [`ArchiveFormat`](crate::embedded::ArchiveFormat).

pub mod buffer;
pub mod local;
pub mod memory;

pub use buffer::BufferFile;
pub use local::{LocalFile, LocalTranslator};
pub use memory::{MemoryFile, MemoryTranslator};

use crate::VfsError;
use std::io;

/// Convert an I/O error into a typed error that names `path`.
pub(crate) fn io_error(error: io::Error, path: &str) -> VfsError {
    match error.kind() {
        io::ErrorKind::NotFound => VfsError::NotFound(path.to_string()),
        io::ErrorKind::AlreadyExists => VfsError::AlreadyExists(path.to_string()),
        io::ErrorKind::PermissionDenied => VfsError::AccessDenied(path.to_string()),
        _ => VfsError::Io(error),
    }
}

/// Whether a name follows the dot-file hiding convention.
pub(crate) fn is_dot_hidden(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}

fn read_only_error(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, format!("{what} is read-only"))
}

fn write_only_error(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, format!("{what} is write-only"))
}

/// Apply a `SeekFrom` to a position inside `len` bytes.
pub(crate) fn seek_position(pos: u64, len: u64, target: io::SeekFrom) -> io::Result<u64> {
    let new = match target {
        io::SeekFrom::Start(offset) => Some(offset),
        io::SeekFrom::End(delta) => len.checked_add_signed(delta),
        io::SeekFrom::Current(delta) => pos.checked_add_signed(delta),
    };

    new.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid seek to a negative or overflowing position",
        )
    })
}
