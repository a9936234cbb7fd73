//! Directory tree on disk.
//!
//! A [`LocalTranslator`] serves paths below one base directory. Absolute
//! paths are accepted only when they lie lexically inside the base;
//! translator-root (`//a/b`) and relative paths are taken relative to it.

use super::{io_error, is_dot_hidden};
use crate::listing::filter_scan;
use crate::mapping::{MappingProvider, MmapProvider};
use crate::path::{VirtualPath, is_directory_path, lexical_normalize};
use crate::translator::{
    DirEntry, DirIter, FileStats, ItemType, OpenDisposition, OpenMode, ScanFilter, Translator,
    VfsFile,
};
use crate::{DEFAULT_ROOT_MARKER, Result, VfsError};
use std::fs::{self, File, FileTimes, Metadata, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Translator over a directory on disk.
#[derive(Debug, Clone)]
pub struct LocalTranslator {
    name: String,
    base: PathBuf,
    marker: String,
    case_sensitive: bool,
}

impl LocalTranslator {
    /// Serve the directory at `base`.
    ///
    /// # Errors
    ///
    /// Returns error if `base` does not exist or is not a directory
    pub fn new(base: impl AsRef<Path>) -> Result<Self> {
        let base = std::path::absolute(base.as_ref())?;
        let base = lexical_normalize(&base);

        if !base.is_dir() {
            return Err(VfsError::NotFound(format!(
                "base directory {} does not exist",
                base.display()
            )));
        }

        Ok(Self {
            name: base.display().to_string(),
            base,
            marker: DEFAULT_ROOT_MARKER.to_string(),
            case_sensitive: crate::config::platform_case_sensitive(),
        })
    }

    /// Set the name used in log output.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the translator root marker.
    #[must_use]
    pub fn with_root_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Override how absolute paths are matched against the base.
    #[must_use]
    pub const fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Host path of a resolved path, plus whether it names the base itself.
    fn host_path(&self, path: &str) -> Result<(PathBuf, bool)> {
        let nodes = VirtualPath::parse_with_marker(path, &self.marker)
            .and_then(|virtual_path| virtual_path.nodes_below(&self.base, self.case_sensitive))
            .ok_or_else(|| VfsError::InvalidPath(format!("{path} is outside {}", self.name)))?;

        let is_base = nodes.is_empty();
        let host = nodes
            .iter()
            .fold(self.base.clone(), |acc, node| acc.join(node));
        Ok((host, is_base))
    }
}

impl Translator for LocalTranslator {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, path: &str, mode: &OpenMode) -> Result<Box<dyn VfsFile>> {
        if is_directory_path(path) {
            return Err(VfsError::InvalidPath(format!("{path} names a directory")));
        }
        if !mode.access.read && !mode.access.write {
            return Err(VfsError::AccessDenied(format!("{path}: no access requested")));
        }

        let (host, _) = self.host_path(path)?;
        if host.is_dir() {
            return Err(VfsError::InvalidPath(format!("{path} is a directory")));
        }

        let mut options = OpenOptions::new();
        options.read(mode.access.read).write(mode.access.write);
        match mode.disposition {
            OpenDisposition::CreateNoOverwrite => options.create_new(true),
            OpenDisposition::OpenExisting => &mut options,
            OpenDisposition::CreateOverwrite => options.create(true).truncate(true),
            OpenDisposition::OpenOrCreate => options.create(mode.access.write),
        };

        let file = match options.open(&host) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound && mode.creates_missing() => {
                open_in_new_parents(&host, &options).map_err(|e| io_error(e, path))?
            }
            Err(e) => return Err(io_error(e, path)),
        };
        debug!("{}: opened {}", self.name, host.display());

        Ok(Box::new(LocalFile {
            file,
            path: host,
            readable: mode.access.read,
            writable: mode.access.write,
        }))
    }

    fn delete(&self, path: &str) -> Result<()> {
        let (host, is_base) = self.host_path(path)?;
        if is_base {
            return Err(VfsError::AccessDenied(format!(
                "refusing to delete the base of {}",
                self.name
            )));
        }

        let metadata = fs::symlink_metadata(&host).map_err(|e| io_error(e, path))?;
        if metadata.is_dir() {
            fs::remove_dir_all(&host)
        } else {
            fs::remove_file(&host)
        }
        .map_err(|e| io_error(e, path))
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let (from, _) = self.host_path(src)?;
        let (to, _) = self.host_path(dst)?;

        if !from.exists() {
            return Err(VfsError::NotFound(src.to_string()));
        }
        fs::rename(&from, &to).map_err(|e| io_error(e, src))
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        let (host, _) = self.host_path(path)?;
        fs::create_dir_all(&host).map_err(|e| io_error(e, path))
    }

    fn query_stats(&self, path: &str) -> Result<FileStats> {
        let (host, _) = self.host_path(path)?;
        let link_metadata = fs::symlink_metadata(&host).map_err(|e| io_error(e, path))?;

        let name = host
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(stats_for(&host, &link_metadata, &name))
    }

    fn begin_listing(&self, dir: &str, pattern: &str, filter: &ScanFilter) -> Result<DirIter> {
        let (host, _) = self.host_path(dir)?;

        let entries = scan_entries(fs::read_dir(&host).map_err(|e| io_error(e, dir))?, |entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Vanished between readdir and stat
            let link_metadata = entry.path().symlink_metadata().ok()?;
            let stats = stats_for(&entry.path(), &link_metadata, &name);
            Some(DirEntry::new(name, stats))
        });

        Ok(filter_scan(entries, pattern, filter, self.case_sensitive))
    }

    fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }
}

/// Create the missing parents of `host` and open it. Directories created
/// here are removed again if the open still fails.
fn open_in_new_parents(host: &Path, options: &OpenOptions) -> io::Result<File> {
    let Some(parent) = host.parent() else {
        return options.open(host);
    };
    let topmost_new = parent
        .ancestors()
        .take_while(|dir| !dir.exists())
        .last()
        .map(Path::to_path_buf);

    fs::create_dir_all(parent)?;
    options.open(host).inspect_err(|_| {
        if let Some(top) = &topmost_new
            && let Err(e) = fs::remove_dir_all(top)
        {
            debug!("Failed to remove {} after a failed open: {e}", top.display());
        }
    })
}

/// Collect readable directory items; unreadable ones are skipped.
fn scan_entries<T>(
    items: impl IntoIterator<Item = io::Result<T>>,
    describe: impl FnMut(T) -> Option<DirEntry>,
) -> Vec<DirEntry> {
    items
        .into_iter()
        .filter_map(|item| {
            item.inspect_err(|e| debug!("Skipping unreadable directory entry: {e}"))
                .ok()
        })
        .filter_map(describe)
        .collect()
}

fn stats_for(host: &Path, link_metadata: &Metadata, name: &str) -> FileStats {
    let is_link = link_metadata.file_type().is_symlink();
    let metadata = if is_link {
        fs::metadata(host).unwrap_or_else(|_| link_metadata.clone())
    } else {
        link_metadata.clone()
    };

    let mut stats = stats_from_metadata(&metadata, name);
    stats.is_link = is_link;
    stats
}

fn stats_from_metadata(metadata: &Metadata, name: &str) -> FileStats {
    let item_type = if metadata.is_dir() {
        ItemType::Directory
    } else if metadata.is_file() {
        ItemType::File
    } else {
        ItemType::Other
    };

    let (is_hidden, is_system) = platform_attributes(metadata, name);

    FileStats {
        item_type,
        size: if item_type == ItemType::Directory {
            0
        } else {
            metadata.len()
        },
        is_hidden,
        is_system,
        is_link: false,
        modified: metadata.modified().ok(),
        created: metadata.created().ok(),
    }
}

#[cfg(windows)]
fn platform_attributes(metadata: &Metadata, name: &str) -> (bool, bool) {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;

    let attributes = metadata.file_attributes();
    (
        attributes & FILE_ATTRIBUTE_HIDDEN != 0 || is_dot_hidden(name),
        attributes & FILE_ATTRIBUTE_SYSTEM != 0,
    )
}

#[cfg(not(windows))]
fn platform_attributes(_metadata: &Metadata, name: &str) -> (bool, bool) {
    (is_dot_hidden(name), false)
}

/// Open file on disk.
#[derive(Debug)]
pub struct LocalFile {
    file: File,
    path: PathBuf,
    readable: bool,
    writable: bool,
}

impl LocalFile {
    /// Host path of the open file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for LocalFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for LocalFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for LocalFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl VfsFile for LocalFile {
    fn size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn set_end(&mut self) -> Result<()> {
        let end = self.file.stream_position()?;
        self.file.set_len(end)?;
        Ok(())
    }

    fn is_readable(&self) -> bool {
        self.readable
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn stats(&self) -> Result<FileStats> {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(stats_from_metadata(&self.file.metadata()?, &name))
    }

    fn set_times(&mut self, time: SystemTime) -> Result<()> {
        let times = FileTimes::new().set_accessed(time).set_modified(time);
        self.file.set_times(times)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    fn create_mapping(&self) -> Result<Box<dyn MappingProvider>> {
        Ok(Box::new(MmapProvider::new(&self.file)?))
    }
}
