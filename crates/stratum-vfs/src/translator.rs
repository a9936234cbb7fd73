//! Backing store contract.
//!
//! A [`Translator`] exposes a storage medium (a directory on disk, an
//! archive, a memory tree) through paths scoped to its own root. Files it
//! opens are returned as [`VfsFile`] handles owned exclusively by the caller.
//!
//! Paths handed to translators are already resolved by the
//! [`PathResolver`](crate::PathResolver): they may carry the root marker
//! (`//a/b`), be absolute, or be relative. A trailing separator marks a
//! directory.

use crate::mapping::MappingProvider;
use crate::{Result, VfsError};
use std::io::{Read, Seek, Write};
use std::time::SystemTime;

/// Requested access of an open call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileAccess {
    /// Handle may be read from.
    pub read: bool,
    /// Handle may be written to.
    pub write: bool,
}

impl FileAccess {
    /// Read-only access.
    pub const READ: Self = Self {
        read: true,
        write: false,
    };

    /// Write-only access.
    pub const WRITE: Self = Self {
        read: false,
        write: true,
    };

    /// Read and write access.
    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
    };
}

/// What an open call does about existing and missing entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenDisposition {
    /// Fail if the entry exists, create it otherwise.
    CreateNoOverwrite,
    /// Fail if the entry is missing.
    OpenExisting,
    /// Create or truncate.
    CreateOverwrite,
    /// Open if present, create otherwise (creation requires write access).
    OpenOrCreate,
}

impl OpenDisposition {
    /// Whether this disposition may create a missing entry.
    pub const fn may_create(self) -> bool {
        !matches!(self, Self::OpenExisting)
    }
}

/// Fully derived open request passed to translators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    /// Requested access.
    pub access: FileAccess,
    /// Existing/missing entry policy.
    pub disposition: OpenDisposition,
}

impl OpenMode {
    /// Read an existing file.
    pub const READ: Self = Self {
        access: FileAccess::READ,
        disposition: OpenDisposition::OpenExisting,
    };

    /// Write a file from scratch, creating or truncating it.
    pub const WRITE_TRUNCATE: Self = Self {
        access: FileAccess::WRITE,
        disposition: OpenDisposition::CreateOverwrite,
    };

    /// Whether a missing entry should be created under this mode.
    pub const fn creates_missing(&self) -> bool {
        self.access.write && self.disposition.may_create()
    }
}

/// Kind of a filesystem item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemType {
    /// Regular file.
    #[default]
    File,
    /// Directory.
    Directory,
    /// Anything else (device, socket, ...).
    Other,
}

/// Stats reported by a translator or an open handle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileStats {
    /// Item kind.
    pub item_type: ItemType,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Hidden attribute.
    pub is_hidden: bool,
    /// System attribute.
    pub is_system: bool,
    /// Item is a junction or symbolic link.
    pub is_link: bool,
    /// Last modification time, when the store records one.
    pub modified: Option<SystemTime>,
    /// Creation time, when the store records one.
    pub created: Option<SystemTime>,
}

impl FileStats {
    /// Stats of a plain file of `size` bytes.
    pub fn file(size: u64) -> Self {
        Self {
            item_type: ItemType::File,
            size,
            ..Self::default()
        }
    }

    /// Stats of a plain directory.
    pub fn directory() -> Self {
        Self {
            item_type: ItemType::Directory,
            ..Self::default()
        }
    }

    /// Timestamp reported as "the" file time: creation when known,
    /// modification otherwise.
    pub fn time(&self) -> Option<SystemTime> {
        self.created.or(self.modified)
    }
}

/// One item produced by a directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name without any directory part.
    pub name: String,
    /// Entry attributes.
    pub stats: FileStats,
}

impl DirEntry {
    /// Create an entry from a name and its stats.
    pub fn new(name: impl Into<String>, stats: FileStats) -> Self {
        Self {
            name: name.into(),
            stats,
        }
    }

    /// Whether this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.stats.item_type == ItemType::Directory
    }
}

/// Items produced by [`Translator::begin_listing`].
pub type DirIter = Box<dyn Iterator<Item = DirEntry> + Send>;

/// Attribute filtering applied by translators while scanning a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ScanFilter {
    /// Skip directories.
    pub no_directory: bool,
    /// Skip files.
    pub no_file: bool,
    /// Skip junctions and links.
    pub no_junction_or_link: bool,
    /// Skip hidden items.
    pub no_hidden: bool,
    /// Skip system items.
    pub no_system: bool,
    /// Directories bypass name patterns.
    pub no_pattern_on_dirs: bool,
    /// Skip the `.` entry.
    pub no_current_dir_desc: bool,
    /// Skip the `..` entry.
    pub no_parent_dir_desc: bool,
}

impl ScanFilter {
    /// Whether an entry passes the attribute filters.
    pub fn admits(&self, entry: &DirEntry) -> bool {
        match entry.name.as_str() {
            "." => return !self.no_current_dir_desc && !self.no_directory,
            ".." => return !self.no_parent_dir_desc && !self.no_directory,
            _ => {}
        }

        let stats = &entry.stats;
        match stats.item_type {
            ItemType::Directory if self.no_directory => return false,
            ItemType::File | ItemType::Other if self.no_file => return false,
            _ => {}
        }

        !(stats.is_link && self.no_junction_or_link
            || stats.is_hidden && self.no_hidden
            || stats.is_system && self.no_system)
    }

    /// The `.` and `..` entries this filter lets through.
    pub fn dot_entries(&self) -> Vec<DirEntry> {
        [".", ".."]
            .into_iter()
            .map(|name| DirEntry::new(name, FileStats::directory()))
            .filter(|entry| self.admits(entry))
            .collect()
    }
}

/// An open native file handle produced by a translator.
///
/// Reading, writing and seeking go through the standard I/O traits.
/// Handles are exclusively owned by one [`FileEngine`](crate::FileEngine).
pub trait VfsFile: Read + Write + Seek + Send {
    /// Current size in bytes.
    fn size(&self) -> Result<u64>;

    /// Truncate or extend the file so that it ends at the current position.
    fn set_end(&mut self) -> Result<()>;

    /// Whether the handle was opened for reading.
    fn is_readable(&self) -> bool;

    /// Whether the handle was opened for writing.
    fn is_writable(&self) -> bool;

    /// Stats of the open item.
    fn stats(&self) -> Result<FileStats>;

    /// Set access and modification time.
    fn set_times(&mut self, time: SystemTime) -> Result<()>;

    /// Push buffered data to the storage medium.
    fn sync(&mut self) -> Result<()> {
        self.flush().map_err(VfsError::from)
    }

    /// Whether the position is at or past the end of the data.
    fn is_eof(&mut self) -> bool {
        match (self.stream_position(), self.size()) {
            (Ok(pos), Ok(size)) => pos >= size,
            _ => true,
        }
    }

    /// Create a mapping provider bound to this handle.
    fn create_mapping(&self) -> Result<Box<dyn MappingProvider>> {
        Err(VfsError::Unsupported(
            "memory mapping not supported by this handle".to_string(),
        ))
    }
}

/// Pluggable backing store.
///
/// Every method may block on the storage medium. Errors are collapsed into
/// "declined" by the router; translators should still return precise
/// errors because the router logs them.
pub trait Translator: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Open a file.
    fn open(&self, path: &str, mode: &OpenMode) -> Result<Box<dyn VfsFile>>;

    /// Delete a file or a directory tree.
    fn delete(&self, path: &str) -> Result<()>;

    /// Rename an entry; both paths must lie inside this store.
    fn rename(&self, src: &str, dst: &str) -> Result<()>;

    /// Create a directory and any missing parents.
    fn create_dir(&self, path: &str) -> Result<()>;

    /// Query stats of an entry.
    fn query_stats(&self, path: &str) -> Result<FileStats>;

    /// Start scanning a directory.
    ///
    /// `pattern` is a glob applied to entry names before `filter`.
    fn begin_listing(&self, dir: &str, pattern: &str, filter: &ScanFilter) -> Result<DirIter>;

    /// Size of an entry without opening it.
    fn size(&self, path: &str) -> Result<u64> {
        self.query_stats(path).map(|stats| stats.size)
    }

    /// Whether names in this store compare case-sensitively.
    fn is_case_sensitive(&self) -> bool {
        crate::config::platform_case_sensitive()
    }
}
