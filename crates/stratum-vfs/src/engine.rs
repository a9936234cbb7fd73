//! Uniform file object
//!
//! A [`FileEngine`] names one caller path and serves every file request for
//! it by delegating to whichever translator first accepts the request. It
//! owns at most one native handle and at most one mapping provider; the
//! provider is always released before the handle.
//!
//! Every operation follows the same failure policy: when no translator can
//! serve a request the result is `false`, `0`, `None` or an empty list.
//! The underlying cause is only recorded in the log.

use crate::listing::{EntryIterator, EntryList, ListFilter};
use crate::mapping::{MapAddress, MapFlags, MappingExtension};
use crate::path::{ResolvedPath, directory_item, file_name_item, lexical_normalize};
use crate::translator::{FileAccess, FileStats, ItemType, OpenDisposition, OpenMode, VfsFile};
use crate::vfs::{Vfs, remove_from_all};
use bitflags::bitflags;
use parking_lot::Mutex;
use std::fmt;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::SystemTime;
use tracing::{debug, warn};

bitflags! {
    /// Open request of a file engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        /// Open for reading.
        const READ = 0x0001;
        /// Open for writing; missing files are created unless
        /// `EXISTING_ONLY` is set.
        const WRITE = 0x0002;
        /// Position writes at the end. Not supported.
        const APPEND = 0x0004;
        /// Truncate an existing file.
        const TRUNCATE = 0x0008;
        /// Fail if the file exists. Not supported.
        const NEW_ONLY = 0x0040;
        /// Fail if the file is missing.
        const EXISTING_ONLY = 0x0080;

        /// Open for reading and writing.
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl OpenFlags {
    /// Disposition implied by these flags.
    ///
    /// `NEW_ONLY` takes precedence over `EXISTING_ONLY`, which takes
    /// precedence over `TRUNCATE`.
    pub fn disposition(self) -> OpenDisposition {
        if self.contains(Self::NEW_ONLY) {
            OpenDisposition::CreateNoOverwrite
        } else if self.contains(Self::EXISTING_ONLY) {
            OpenDisposition::OpenExisting
        } else if self.contains(Self::TRUNCATE) {
            OpenDisposition::CreateOverwrite
        } else {
            OpenDisposition::OpenOrCreate
        }
    }

    /// Translator open mode, or `None` for unsupported combinations.
    ///
    /// Append mode, exclusive creation and requests without any access are
    /// rejected.
    pub fn open_mode(self) -> Option<OpenMode> {
        if self.intersects(Self::APPEND | Self::NEW_ONLY) {
            return None;
        }

        let access = FileAccess {
            read: self.contains(Self::READ),
            write: self.contains(Self::WRITE),
        };
        if !access.read && !access.write {
            return None;
        }

        Some(OpenMode {
            access,
            disposition: self.disposition(),
        })
    }
}

bitflags! {
    /// Attributes reported by [`FileEngine::file_flags`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FileFlags: u32 {
        /// Some translator knows the path.
        const EXISTS = 0x0001;
        /// Regular file.
        const FILE = 0x0002;
        /// Directory.
        const DIRECTORY = 0x0004;
        /// Hidden item.
        const HIDDEN = 0x0008;
        /// Junction or symbolic link.
        const LINK = 0x0010;
    }
}

impl FileFlags {
    /// Map translator stats onto the flag set.
    pub fn from_stats(stats: &FileStats) -> Self {
        let mut flags = Self::EXISTS;
        match stats.item_type {
            ItemType::File => flags |= Self::FILE,
            ItemType::Directory => flags |= Self::DIRECTORY,
            ItemType::Other => {}
        }
        if stats.is_hidden {
            flags |= Self::HIDDEN;
        }
        if stats.is_link {
            flags |= Self::LINK;
        }
        flags
    }
}

/// Which form of the engine's name [`FileEngine::file_name`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileNameKind {
    /// The path as given.
    #[default]
    Default,
    /// Last node only.
    Base,
    /// Directory part, without the last node.
    Path,
    /// Absolute path.
    Absolute,
    /// Directory part of the absolute path.
    AbsolutePath,
}

/// Mutable part of an engine, shared with the layer so that deactivation
/// can release it.
pub(crate) struct EngineState {
    location: String,
    mappings: MappingExtension,
    file: Option<Box<dyn VfsFile>>,
}

impl EngineState {
    /// Release the mapping provider, then the handle.
    pub(crate) fn release(&mut self) {
        self.mappings.release();
        if self.file.take().is_some() {
            debug!("Closed handle of {}", self.location);
        }
    }
}

impl Drop for EngineState {
    fn drop(&mut self) {
        self.release();
    }
}

/// File object served by the translator chain.
pub struct FileEngine {
    vfs: Arc<Vfs>,
    state: Arc<Mutex<EngineState>>,
}

impl fmt::Debug for FileEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FileEngine")
            .field("location", &state.location)
            .field("open", &state.file.is_some())
            .field("mappings", &state.mappings)
            .finish()
    }
}

impl FileEngine {
    pub(crate) fn new(vfs: Arc<Vfs>, location: &str) -> Self {
        Self {
            vfs,
            state: Arc::new(Mutex::new(EngineState {
                location: location.to_string(),
                mappings: MappingExtension::new(),
                file: None,
            })),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<Mutex<EngineState>> {
        Arc::downgrade(&self.state)
    }

    /// Caller path this engine serves.
    pub fn location(&self) -> String {
        self.state.lock().location.clone()
    }

    /// Whether a handle is held.
    pub fn is_open(&self) -> bool {
        self.state.lock().file.is_some()
    }

    fn resolved(&self, path: &str) -> ResolvedPath {
        self.vfs.resolver().resolve(path)
    }

    /// Open `path` through the first translator that accepts it.
    fn open_through_chain(&self, path: &str, mode: &OpenMode) -> Option<Box<dyn VfsFile>> {
        let translators = self.vfs.chain()?;
        let resolved = self.resolved(path);

        for translator in &translators {
            match translator.open(resolved.as_str(), mode) {
                Ok(file) => {
                    debug!("Translator '{}' opened {resolved}", translator.name());
                    return Some(file);
                }
                Err(e) => debug!("Translator '{}' declined {resolved}: {e}", translator.name()),
            }
        }

        debug!("No translator could open {resolved}");
        None
    }

    /// Open the file.
    ///
    /// Unsupported flag combinations fail without touching the engine.
    /// Otherwise any held mapping and handle are released first, so a
    /// failed open leaves the engine closed.
    pub fn open(&self, flags: OpenFlags) -> bool {
        let Some(mode) = flags.open_mode() else {
            debug!("Rejected unsupported open flags {flags:?}");
            return false;
        };
        if !self.vfs.is_active() {
            return false;
        }

        let mut state = self.state.lock();
        state.release();

        let location = state.location.clone();
        match self.open_through_chain(&location, &mode) {
            Some(file) => {
                state.file = Some(file);
                true
            }
            None => false,
        }
    }

    /// Release the handle and every mapping. Always succeeds.
    pub fn close(&self) -> bool {
        self.state.lock().release();
        true
    }

    /// Read into `buf`; 0 when no handle is held.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        let mut state = self.state.lock();
        let Some(file) = state.file.as_mut() else {
            return 0;
        };

        loop {
            match file.read(buf) {
                Ok(count) => return count,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!("Read failed: {e}");
                    return 0;
                }
            }
        }
    }

    /// Write `buf`; returns the bytes the handle accepted, 0 when no handle
    /// is held.
    pub fn write(&self, buf: &[u8]) -> usize {
        let mut state = self.state.lock();
        let Some(file) = state.file.as_mut() else {
            return 0;
        };

        let mut written = 0;
        while written < buf.len() {
            match file.write(&buf[written..]) {
                Ok(0) => {
                    debug!("Write stopped after {written} of {} bytes", buf.len());
                    break;
                }
                Ok(count) => written += count,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!("Write failed after {written} of {} bytes: {e}", buf.len());
                    break;
                }
            }
        }
        written
    }

    /// Seek to an absolute position.
    pub fn seek(&self, pos: u64) -> bool {
        self.state
            .lock()
            .file
            .as_mut()
            .is_some_and(|file| file.seek(SeekFrom::Start(pos)).is_ok())
    }

    /// Current position; 0 when no handle is held.
    pub fn pos(&self) -> u64 {
        self.state
            .lock()
            .file
            .as_mut()
            .and_then(|file| file.stream_position().ok())
            .unwrap_or(0)
    }

    /// Whether the position is at the end; true when no handle is held.
    pub fn at_end(&self) -> bool {
        self.state
            .lock()
            .file
            .as_mut()
            .is_none_or(|file| file.is_eof())
    }

    /// Flush buffered writes.
    pub fn flush(&self) -> bool {
        self.state
            .lock()
            .file
            .as_mut()
            .is_some_and(|file| file.flush().is_ok())
    }

    /// Push data to the storage medium.
    pub fn sync(&self) -> bool {
        self.state
            .lock()
            .file
            .as_mut()
            .is_some_and(|file| file.sync().is_ok())
    }

    /// Size in bytes.
    ///
    /// With a handle the handle answers. Without one, the first translator
    /// along the chain that knows the path answers; 0 if none does.
    pub fn size(&self) -> u64 {
        let location = {
            let state = self.state.lock();
            if let Some(file) = state.file.as_ref() {
                return file.size().unwrap_or(0);
            }
            state.location.clone()
        };

        let Some(translators) = self.vfs.chain() else {
            return 0;
        };
        let resolved = self.resolved(&location);

        translators
            .iter()
            .find_map(|translator| translator.size(resolved.as_str()).ok())
            .unwrap_or(0)
    }

    /// Truncate or extend the held file to `size` bytes.
    ///
    /// Seeks to `size`, marks the end there and restores the previous
    /// position. A failure in any step fails the whole call and leaves the
    /// position undefined.
    pub fn set_size(&self, size: u64) -> bool {
        let mut state = self.state.lock();
        let Some(file) = state.file.as_mut() else {
            return false;
        };

        let result = file.stream_position().and_then(|previous| {
            file.seek(SeekFrom::Start(size))?;
            file.set_end().map_err(std::io::Error::other)?;
            file.seek(SeekFrom::Start(previous))
        });

        match result {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to resize to {size} bytes, position is undefined: {e}");
                false
            }
        }
    }

    /// Delete the path from every translator; true if any accepted.
    pub fn remove(&self) -> bool {
        let Some(translators) = self.vfs.chain() else {
            return false;
        };
        let resolved = self.resolved(&self.location());
        remove_from_all(&translators, resolved.as_str())
    }

    /// Rename through the first translator that accepts both paths.
    ///
    /// The engine keeps naming the old path.
    pub fn rename(&self, new_name: &str) -> bool {
        let Some(translators) = self.vfs.chain() else {
            return false;
        };
        let src = self.resolved(&self.location());
        let dst = self.resolved(new_name);

        for translator in &translators {
            match translator.rename(src.as_str(), dst.as_str()) {
                Ok(()) => {
                    debug!("Translator '{}' renamed {src} to {dst}", translator.name());
                    return true;
                }
                Err(e) => debug!(
                    "Translator '{}' declined rename {src} to {dst}: {e}",
                    translator.name()
                ),
            }
        }
        false
    }

    /// Copy the file to `new_name`.
    ///
    /// Source and destination are opened independently through the whole
    /// chain, so they may live in different translators.
    pub fn copy(&self, new_name: &str) -> bool {
        let Some(mut src) = self.open_through_chain(&self.location(), &OpenMode::READ) else {
            return false;
        };
        let Some(mut dst) = self.open_through_chain(new_name, &OpenMode::WRITE_TRUNCATE) else {
            return false;
        };

        let mut buffer = vec![0u8; self.vfs.config().copy_buffer_size];
        let mut copied = 0u64;
        loop {
            let count = match src.read(&mut buffer) {
                Ok(0) => break,
                Ok(count) => count,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Copy to {new_name} failed while reading: {e}");
                    return false;
                }
            };
            if let Err(e) = dst.write_all(&buffer[..count]) {
                debug!("Copy to {new_name} failed while writing: {e}");
                return false;
            }
            copied += count as u64;
        }

        debug!("Copied {copied} bytes to {new_name}");
        dst.flush().is_ok()
    }

    /// Stats from the first translator that knows the path.
    pub fn stat(&self) -> Option<FileStats> {
        let translators = self.vfs.chain()?;
        let resolved = self.resolved(&self.location());

        translators
            .iter()
            .find_map(|translator| match translator.query_stats(resolved.as_str()) {
                Ok(stats) => Some(stats),
                Err(e) => {
                    debug!("Translator '{}' has no stats for {resolved}: {e}", translator.name());
                    None
                }
            })
    }

    /// Attribute flags; empty when the path is unknown.
    pub fn file_flags(&self) -> FileFlags {
        self.stat()
            .map(|stats| FileFlags::from_stats(&stats))
            .unwrap_or_default()
    }

    /// Process-wide case policy.
    pub fn case_sensitive(&self) -> bool {
        self.vfs.case_sensitive()
    }

    /// Whether the engine's path is relative.
    pub fn is_relative_path(&self) -> bool {
        self.vfs.is_active() && self.vfs.resolver().is_relative(&self.location())
    }

    /// Merged listing of the engine's path as a directory.
    pub fn entry_list<S: AsRef<str>>(&self, filters: ListFilter, patterns: &[S]) -> EntryList {
        self.vfs.list(&self.location(), filters, patterns)
    }

    /// Restartable iterator over [`entry_list`](Self::entry_list);
    /// `None` while the layer is inactive.
    pub fn begin_entry_list<S: AsRef<str>>(
        &self,
        filters: ListFilter,
        patterns: &[S],
    ) -> Option<EntryIterator> {
        if !self.vfs.is_active() {
            return None;
        }
        Some(self.entry_list(filters, patterns).into_entry_iter())
    }

    /// Create a directory through the first translator.
    ///
    /// Parents are always created, whatever `_create_parents` says.
    pub fn mkdir(&self, dir: &str, _create_parents: bool) -> bool {
        self.vfs.mkdir(dir)
    }

    /// Delete a directory from every translator.
    ///
    /// Empty parents are never removed.
    pub fn rmdir(&self, dir: &str, _recurse_parents: bool) -> bool {
        self.vfs.rmdir(dir)
    }

    /// Name of the engine's path in the requested form.
    ///
    /// Absolute forms are computed without touching the filesystem; empty
    /// while the layer is inactive.
    pub fn file_name(&self, kind: FileNameKind) -> String {
        if !self.vfs.is_active() {
            return String::new();
        }

        let location = self.location();
        match kind {
            FileNameKind::Default => location,
            FileNameKind::Base => file_name_item(&location).to_string(),
            FileNameKind::Path => parent_name(&location),
            FileNameKind::Absolute => self.absolute_name(&location),
            FileNameKind::AbsolutePath => parent_name(&self.absolute_name(&location)),
        }
    }

    fn absolute_name(&self, location: &str) -> String {
        let resolver = self.vfs.resolver();

        let absolute = if let Some(rest) = location.strip_prefix(resolver.marker()) {
            match resolver.app_root() {
                Some(root) => root.join(rest),
                None => return location.to_string(),
            }
        } else if Path::new(location).is_absolute() {
            PathBuf::from(location)
        } else {
            let base = match resolver.app_root() {
                Some(root) => Some(root.to_path_buf()),
                None => std::env::current_dir().ok(),
            };
            match base {
                Some(base) => base.join(location),
                None => return location.to_string(),
            }
        };

        lexical_normalize(&absolute).to_string_lossy().into_owned()
    }

    /// Point the engine at another path; a held handle stays open.
    pub fn set_file_name(&self, path: &str) {
        self.state.lock().location = path.to_string();
    }

    /// Set access and modification times of the held file.
    pub fn set_file_time(&self, time: SystemTime) -> bool {
        self.state
            .lock()
            .file
            .as_mut()
            .is_some_and(|file| file.set_times(time).is_ok())
    }

    /// File time of the held handle, or of the first translator that knows
    /// the path.
    pub fn file_time(&self) -> Option<SystemTime> {
        if !self.vfs.is_active() {
            return None;
        }

        let held = {
            let state = self.state.lock();
            state
                .file
                .as_ref()
                .and_then(|file| file.stats().ok())
                .and_then(|stats| stats.time())
        };
        if held.is_some() {
            return held;
        }

        self.stat().and_then(|stats| stats.time())
    }

    /// Copy this engine's path into `target`. The held handle is not
    /// duplicated.
    pub fn clone_to(&self, target: &Self) -> bool {
        if Arc::ptr_eq(&self.state, &target.state) {
            return true;
        }
        let location = self.location();
        target.set_file_name(&location);
        true
    }

    /// Map `len` bytes at `offset` of the held file.
    ///
    /// The mapping provider is created on first use and reused afterwards.
    pub fn map(&self, offset: u64, len: usize, flags: MapFlags) -> Option<MapAddress> {
        let mut guard = self.state.lock();
        let EngineState { file, mappings, .. } = &mut *guard;
        let file = file.as_deref()?;

        mappings
            .map(file, offset, len, flags)
            .inspect_err(|e| debug!("Mapping {len} bytes at {offset} failed: {e}"))
            .ok()
    }

    /// Release a mapped region; false if `address` is not mapped.
    pub fn unmap(&self, address: MapAddress) -> bool {
        self.state.lock().mappings.unmap(address)
    }

    /// Run `f` over a mapped region.
    pub fn with_region<R>(&self, address: MapAddress, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        self.state.lock().mappings.region(address).map(f)
    }

    /// Run `f` over a writable mapped region.
    pub fn with_region_mut<R>(
        &self,
        address: MapAddress,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Option<R> {
        self.state.lock().mappings.region_mut(address).map(f)
    }

    /// Number of live mapped regions.
    pub fn mapped_regions(&self) -> usize {
        self.state.lock().mappings.region_count()
    }
}

fn parent_name(path: &str) -> String {
    let parent = directory_item(path);
    match parent.trim_end_matches(['/', '\\']) {
        "" if parent.is_empty() => ".".to_string(),
        "" => parent.to_string(),
        trimmed => trimmed.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::VfsConfig;
    use crate::backend::MemoryTranslator;
    use pretty_assertions::assert_eq;

    fn layer_with(files: &[(&str, &str)]) -> (Arc<Vfs>, Arc<MemoryTranslator>) {
        let vfs = Vfs::new(VfsConfig::default()).expect("layer");
        let memory = Arc::new(MemoryTranslator::new());
        for (path, data) in files {
            memory.insert_file(path, *data).expect("insert");
        }
        vfs.register_translator(memory.clone());
        (vfs, memory)
    }

    #[test]
    fn test_disposition_precedence() {
        use crate::translator::OpenDisposition::*;
        assert_eq!(
            (OpenFlags::WRITE | OpenFlags::NEW_ONLY | OpenFlags::EXISTING_ONLY).disposition(),
            CreateNoOverwrite
        );
        assert_eq!(
            (OpenFlags::WRITE | OpenFlags::EXISTING_ONLY | OpenFlags::TRUNCATE).disposition(),
            OpenExisting
        );
        assert_eq!(
            (OpenFlags::WRITE | OpenFlags::TRUNCATE).disposition(),
            CreateOverwrite
        );
        assert_eq!(OpenFlags::READ.disposition(), OpenOrCreate);
    }

    #[test]
    fn test_unsupported_flags_rejected_without_side_effects() {
        let (vfs, _memory) = layer_with(&[("//a.txt", "abc")]);
        let engine = vfs.create_engine("//a.txt").expect("engine");
        assert!(engine.open(OpenFlags::READ));

        assert!(!engine.open(OpenFlags::WRITE | OpenFlags::APPEND));
        assert!(!engine.open(OpenFlags::WRITE | OpenFlags::NEW_ONLY));
        assert!(!engine.open(OpenFlags::empty()));
        assert!(engine.is_open());
    }

    #[test]
    fn test_failed_reopen_leaves_engine_closed() {
        let (vfs, _memory) = layer_with(&[("//a.txt", "abc")]);
        let engine = vfs.create_engine("//a.txt").expect("engine");
        assert!(engine.open(OpenFlags::READ));

        engine.set_file_name("//missing.txt");
        assert!(!engine.open(OpenFlags::READ));
        assert!(!engine.is_open());
    }

    #[test]
    fn test_io_without_handle() {
        let (vfs, _memory) = layer_with(&[("//a.txt", "abc")]);
        let engine = vfs.create_engine("//a.txt").expect("engine");

        let mut buf = [0u8; 4];
        assert_eq!(engine.read(&mut buf), 0);
        assert_eq!(engine.write(b"x"), 0);
        assert!(!engine.seek(1));
        assert!(!engine.flush());
        assert!(!engine.sync());
        assert!(!engine.set_size(1));
        assert!(!engine.set_file_time(SystemTime::now()));
        assert_eq!(engine.pos(), 0);
        assert!(engine.at_end());
        assert!(engine.close());
    }

    #[test]
    fn test_read_write_seek() {
        let (vfs, memory) = layer_with(&[]);
        let engine = vfs.create_engine("//notes.txt").expect("engine");

        assert!(engine.open(OpenFlags::READ_WRITE));
        assert_eq!(engine.write(b"hello world"), 11);
        assert!(engine.at_end());
        assert!(engine.seek(6));
        assert_eq!(engine.pos(), 6);

        let mut buf = [0u8; 5];
        assert_eq!(engine.read(&mut buf), 5);
        assert_eq!(&buf, b"world");
        assert!(engine.flush());
        assert_eq!(
            memory.file_contents("//notes.txt"),
            Some(b"hello world".to_vec())
        );
    }

    #[test]
    fn test_read_only_open_does_not_create() {
        let (vfs, memory) = layer_with(&[]);
        let engine = vfs.create_engine("//ghost.txt").expect("engine");
        assert!(!engine.open(OpenFlags::READ));
        assert!(!memory.contains("//ghost.txt"));
    }

    #[test]
    fn test_set_size_restores_position() {
        let (vfs, memory) = layer_with(&[("//a.bin", "0123456789")]);
        let engine = vfs.create_engine("//a.bin").expect("engine");
        assert!(engine.open(OpenFlags::READ_WRITE | OpenFlags::EXISTING_ONLY));

        assert!(engine.seek(3));
        assert!(engine.set_size(5));
        assert_eq!(engine.pos(), 3);
        assert_eq!(engine.size(), 5);
        assert!(engine.set_size(8));
        assert_eq!(
            memory.file_contents("//a.bin"),
            Some(b"01234\0\0\0".to_vec())
        );
    }

    #[test]
    fn test_set_size_on_read_only_handle_fails() {
        let (vfs, _memory) = layer_with(&[("//a.bin", "0123")]);
        let engine = vfs.create_engine("//a.bin").expect("engine");
        assert!(engine.open(OpenFlags::READ));
        assert!(!engine.set_size(2));
    }

    #[test]
    fn test_size_without_handle_walks_chain() {
        let (vfs, _memory) = layer_with(&[]);
        let second = Arc::new(MemoryTranslator::named("second"));
        second.insert_file("//only-here.txt", "12345").expect("insert");
        vfs.register_translator(second);

        let engine = vfs.create_engine("//only-here.txt").expect("engine");
        assert_eq!(engine.size(), 5);

        let missing = vfs.create_engine("//nowhere.txt").expect("engine");
        assert_eq!(missing.size(), 0);
    }

    #[test]
    fn test_copy_across_translators() {
        let (vfs, _memory) = layer_with(&[("//src.txt", "payload")]);
        let target = Arc::new(MemoryTranslator::named("target").with_root("/target"));
        vfs.register_translator(target.clone());

        let engine = vfs.create_engine("//src.txt").expect("engine");
        assert!(engine.copy("/target/dst.txt"));
        assert_eq!(
            target.file_contents("/target/dst.txt"),
            Some(b"payload".to_vec())
        );

        let missing = vfs.create_engine("//missing.txt").expect("engine");
        assert!(!missing.copy("//other.txt"));
    }

    #[test]
    fn test_copy_uses_small_chunks() {
        let vfs = Vfs::new(VfsConfig::default().with_copy_buffer_size(3)).expect("layer");
        let memory = Arc::new(MemoryTranslator::new());
        memory.insert_file("//a", "abcdefgh").expect("insert");
        vfs.register_translator(memory.clone());

        let engine = vfs.create_engine("//a").expect("engine");
        assert!(engine.copy("//b"));
        assert_eq!(memory.file_contents("//b"), Some(b"abcdefgh".to_vec()));
    }

    #[test]
    fn test_stat_and_flags() {
        let (vfs, memory) = layer_with(&[("//dir/.hidden", "h")]);
        memory.insert_dir("//dir/sub").expect("mkdir");

        let hidden = vfs.create_engine("//dir/.hidden").expect("engine");
        assert_eq!(
            hidden.file_flags(),
            FileFlags::EXISTS | FileFlags::FILE | FileFlags::HIDDEN
        );

        let dir = vfs.create_engine("//dir/sub").expect("engine");
        assert_eq!(dir.file_flags(), FileFlags::EXISTS | FileFlags::DIRECTORY);

        let missing = vfs.create_engine("//nope").expect("engine");
        assert_eq!(missing.file_flags(), FileFlags::empty());
        assert!(missing.stat().is_none());
    }

    #[test]
    fn test_file_name_kinds() {
        let vfs = Vfs::new(VfsConfig::new("/srv/app")).expect("layer");
        let engine = vfs.create_engine("data/./maps/level.bin").expect("engine");

        assert_eq!(engine.file_name(FileNameKind::Default), "data/./maps/level.bin");
        assert_eq!(engine.file_name(FileNameKind::Base), "level.bin");
        assert_eq!(engine.file_name(FileNameKind::Path), "data/./maps");
        assert_eq!(
            engine.file_name(FileNameKind::Absolute),
            "/srv/app/data/maps/level.bin"
        );
        assert_eq!(
            engine.file_name(FileNameKind::AbsolutePath),
            "/srv/app/data/maps"
        );

        let anchored = vfs.create_engine("//a/b.txt").expect("engine");
        assert_eq!(anchored.file_name(FileNameKind::Absolute), "/srv/app/a/b.txt");

        let bare = vfs.create_engine("b.txt").expect("engine");
        assert_eq!(bare.file_name(FileNameKind::Path), ".");
    }

    #[test]
    fn test_relative_path_policy() {
        let (vfs, _memory) = layer_with(&[]);
        let relative = vfs.create_engine("a/b").expect("engine");
        let anchored = vfs.create_engine("//a/b").expect("engine");
        let absolute = vfs.create_engine("/a/b").expect("engine");

        assert!(relative.is_relative_path());
        assert!(!anchored.is_relative_path());
        assert!(!absolute.is_relative_path());
    }

    #[test]
    fn test_clone_to_copies_location_only() {
        let (vfs, _memory) = layer_with(&[("//a.txt", "a")]);
        let source = vfs.create_engine("//a.txt").expect("engine");
        let target = vfs.create_engine("//other.txt").expect("engine");
        assert!(source.open(OpenFlags::READ));

        assert!(source.clone_to(&target));
        assert_eq!(target.location(), "//a.txt");
        assert!(!target.is_open());
        assert!(source.clone_to(&source));
    }

    #[test]
    fn test_file_time() {
        let (vfs, _memory) = layer_with(&[("//a.txt", "a")]);
        let engine = vfs.create_engine("//a.txt").expect("engine");
        assert!(engine.file_time().is_some());

        let missing = vfs.create_engine("//missing").expect("engine");
        assert!(missing.file_time().is_none());

        assert!(engine.open(OpenFlags::READ_WRITE));
        assert!(engine.set_file_time(SystemTime::UNIX_EPOCH));
        assert!(engine.file_time().is_some());
    }

    #[test]
    fn test_begin_entry_list() {
        let (vfs, _memory) = layer_with(&[("//d/b.txt", "b"), ("//d/a.txt", "a")]);
        let engine = vfs.create_engine("//d").expect("engine");

        let mut entries = engine
            .begin_entry_list(ListFilter::FILES, &["*.txt"])
            .expect("iterator");
        assert_eq!(entries.next().as_deref(), Some("a.txt"));
        assert_eq!(entries.current_file_name(), Some("a.txt"));
        assert_eq!(entries.next().as_deref(), Some("b.txt"));
        assert!(!entries.has_next());

        entries.rewind();
        assert_eq!(entries.collect::<Vec<_>>(), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_map_requires_handle() {
        let (vfs, _memory) = layer_with(&[("//m.bin", "mapped bytes")]);
        let engine = vfs.create_engine("//m.bin").expect("engine");
        assert!(engine.map(0, 4, MapFlags::empty()).is_none());

        assert!(engine.open(OpenFlags::READ));
        let address = engine.map(7, 5, MapFlags::empty()).expect("map");
        assert_eq!(
            engine.with_region(address, |bytes| bytes.to_vec()),
            Some(b"bytes".to_vec())
        );
        assert!(engine.with_region_mut(address, |_| ()).is_none());
        assert!(engine.map(0, 64, MapFlags::empty()).is_none());

        assert!(engine.unmap(address));
        assert!(!engine.unmap(address));
    }

    #[test]
    fn test_close_invalidates_mappings() {
        let (vfs, _memory) = layer_with(&[("//m.bin", "mapped bytes")]);
        let engine = vfs.create_engine("//m.bin").expect("engine");
        assert!(engine.open(OpenFlags::READ));

        let address = engine.map(0, 6, MapFlags::PRIVATE).expect("map");
        assert_eq!(engine.mapped_regions(), 1);
        assert!(engine.close());
        assert_eq!(engine.mapped_regions(), 0);
        assert!(!engine.unmap(address));
    }

    /// Handle that accepts `limit` bytes, then fails, and records no times.
    struct ShortFile {
        data: Vec<u8>,
        limit: usize,
    }

    impl Read for ShortFile {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Ok(0)
        }
    }

    impl Write for ShortFile {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let room = self.limit - self.data.len();
            if room == 0 {
                return Err(std::io::Error::other("device full"));
            }
            let count = buf.len().min(room).min(2);
            self.data.extend_from_slice(&buf[..count]);
            Ok(count)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Seek for ShortFile {
        fn seek(&mut self, _pos: SeekFrom) -> std::io::Result<u64> {
            Ok(self.data.len() as u64)
        }
    }

    impl VfsFile for ShortFile {
        fn size(&self) -> crate::Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn set_end(&mut self) -> crate::Result<()> {
            Ok(())
        }

        fn is_readable(&self) -> bool {
            true
        }

        fn is_writable(&self) -> bool {
            true
        }

        fn stats(&self) -> crate::Result<FileStats> {
            Ok(FileStats::file(self.data.len() as u64))
        }

        fn set_times(&mut self, _time: SystemTime) -> crate::Result<()> {
            Ok(())
        }
    }

    /// Serves `ShortFile` handles; its stats carry a modification time.
    struct ShortTranslator;

    impl crate::Translator for ShortTranslator {
        fn name(&self) -> &str {
            "short"
        }

        fn open(&self, _path: &str, _mode: &OpenMode) -> crate::Result<Box<dyn VfsFile>> {
            Ok(Box::new(ShortFile {
                data: Vec::new(),
                limit: 5,
            }))
        }

        fn delete(&self, path: &str) -> crate::Result<()> {
            Err(crate::VfsError::Unsupported(path.to_string()))
        }

        fn rename(&self, src: &str, _dst: &str) -> crate::Result<()> {
            Err(crate::VfsError::Unsupported(src.to_string()))
        }

        fn create_dir(&self, path: &str) -> crate::Result<()> {
            Err(crate::VfsError::Unsupported(path.to_string()))
        }

        fn query_stats(&self, _path: &str) -> crate::Result<FileStats> {
            Ok(FileStats {
                modified: Some(SystemTime::UNIX_EPOCH),
                ..FileStats::file(0)
            })
        }

        fn begin_listing(
            &self,
            dir: &str,
            _pattern: &str,
            _filter: &crate::ScanFilter,
        ) -> crate::Result<crate::DirIter> {
            Err(crate::VfsError::Unsupported(dir.to_string()))
        }
    }

    fn short_engine() -> FileEngine {
        let vfs = Vfs::new(VfsConfig::default()).expect("layer");
        vfs.register_translator(Arc::new(ShortTranslator));
        let engine = vfs.create_engine("//short.bin").expect("engine");
        assert!(engine.open(OpenFlags::WRITE));
        engine
    }

    #[test]
    fn test_partial_write_reports_accepted_bytes() {
        let engine = short_engine();
        assert_eq!(engine.write(b"abcdefgh"), 5);
        assert_eq!(engine.write(b"ij"), 0);
        assert_eq!(engine.size(), 5);
    }

    #[test]
    fn test_file_time_falls_back_to_chain() {
        let engine = short_engine();
        assert_eq!(engine.file_time(), Some(SystemTime::UNIX_EPOCH));
    }
}
