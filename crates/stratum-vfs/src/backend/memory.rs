//! Volatile in-memory tree.
//!
//! Files are shared buffers: data written through one handle is visible to
//! every later open of the same path. Mappings are private copies of the
//! requested range; shared writable regions are written back when they are
//! unmapped or when their provider is dropped.

use super::{io_error, is_dot_hidden, read_only_error, seek_position, write_only_error};
use crate::listing::filter_scan;
use crate::mapping::{MapAccess, MapAddress, MappingProvider, check_bounds};
use crate::path::{VirtualPath, is_directory_path};
use crate::translator::{
    DirEntry, DirIter, FileStats, OpenDisposition, OpenMode, ScanFilter, Translator, VfsFile,
};
use crate::{DEFAULT_ROOT_MARKER, Result, VfsError};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug)]
struct FileNode {
    data: RwLock<Vec<u8>>,
    created: SystemTime,
    modified: Mutex<SystemTime>,
}

impl FileNode {
    fn new(data: Vec<u8>) -> Arc<Self> {
        let now = SystemTime::now();
        Arc::new(Self {
            data: RwLock::new(data),
            created: now,
            modified: Mutex::new(now),
        })
    }

    fn touch(&self) {
        *self.modified.lock() = SystemTime::now();
    }

    fn stats(&self, name: &str) -> FileStats {
        FileStats {
            is_hidden: is_dot_hidden(name),
            modified: Some(*self.modified.lock()),
            created: Some(self.created),
            ..FileStats::file(self.data.read().len() as u64)
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    File(Arc<FileNode>),
    Directory,
}

/// Translator over an in-memory tree.
#[derive(Debug)]
pub struct MemoryTranslator {
    name: String,
    root: PathBuf,
    marker: String,
    read_only: bool,
    nodes: RwLock<BTreeMap<String, Node>>,
}

impl Default for MemoryTranslator {
    fn default() -> Self {
        Self::named("memory")
    }
}

impl MemoryTranslator {
    /// Empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty tree with a log name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: PathBuf::from("/"),
            marker: DEFAULT_ROOT_MARKER.to_string(),
            read_only: false,
            nodes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Absolute paths are accepted below `root` (default `/`).
    #[must_use]
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    /// Set the translator root marker.
    #[must_use]
    pub fn with_root_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Refuse every modification through the translator contract.
    ///
    /// `insert_file` and `insert_dir` keep working so the tree can still be
    /// populated by its owner.
    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Add or replace a file, creating missing parent directories.
    pub fn insert_file(&self, path: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        let key = self.key_for(path)?;
        if key.is_empty() {
            return Err(VfsError::InvalidPath(path.to_string()));
        }

        let mut nodes = self.nodes.write();
        Self::ensure_parents(&mut nodes, &key, path)?;
        if matches!(nodes.get(&key), Some(Node::Directory)) {
            return Err(VfsError::AlreadyExists(path.to_string()));
        }
        nodes.insert(key, Node::File(FileNode::new(data.into())));
        Ok(())
    }

    /// Add a directory and any missing parents.
    pub fn insert_dir(&self, path: &str) -> Result<()> {
        let key = self.key_for(path)?;
        let mut nodes = self.nodes.write();
        Self::make_dirs(&mut nodes, &key, path)
    }

    /// Whether `path` exists.
    pub fn contains(&self, path: &str) -> bool {
        self.key_for(path)
            .is_ok_and(|key| key.is_empty() || self.nodes.read().contains_key(&key))
    }

    /// Copy of a file's contents.
    pub fn file_contents(&self, path: &str) -> Option<Vec<u8>> {
        let key = self.key_for(path).ok()?;
        match self.nodes.read().get(&key)? {
            Node::File(file) => Some(file.data.read().clone()),
            Node::Directory => None,
        }
    }

    fn key_for(&self, path: &str) -> Result<String> {
        VirtualPath::parse_with_marker(path, &self.marker)
            .and_then(|virtual_path| virtual_path.nodes_below(&self.root, true))
            .map(|nodes| nodes.join("/"))
            .ok_or_else(|| VfsError::InvalidPath(format!("{path} is outside {}", self.name)))
    }

    fn check_writable(&self, path: &str) -> Result<()> {
        if self.read_only {
            return Err(VfsError::AccessDenied(format!("{} is read-only: {path}", self.name)));
        }
        Ok(())
    }

    fn is_dir(nodes: &BTreeMap<String, Node>, key: &str) -> bool {
        key.is_empty() || matches!(nodes.get(key), Some(Node::Directory))
    }

    fn ensure_parents(nodes: &mut BTreeMap<String, Node>, key: &str, path: &str) -> Result<()> {
        match key.rfind('/') {
            Some(index) => Self::make_dirs(nodes, &key[..index], path),
            None => Ok(()),
        }
    }

    fn make_dirs(nodes: &mut BTreeMap<String, Node>, key: &str, path: &str) -> Result<()> {
        if key.is_empty() {
            return Ok(());
        }

        let mut prefix = String::new();
        for node in key.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(node);

            match nodes.get(&prefix) {
                Some(Node::Directory) => {}
                Some(Node::File(_)) => return Err(VfsError::AlreadyExists(path.to_string())),
                None => {
                    nodes.insert(prefix.clone(), Node::Directory);
                }
            }
        }
        Ok(())
    }

    fn descendants(nodes: &BTreeMap<String, Node>, key: &str) -> Vec<String> {
        let prefix = format!("{key}/");
        nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

impl Translator for MemoryTranslator {
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
        if mode.access.write {
            self.check_writable(path)?;
        }

        let key = self.key_for(path)?;
        let mut nodes = self.nodes.write();
        if Self::is_dir(&nodes, &key) {
            return Err(VfsError::InvalidPath(format!("{path} is a directory")));
        }

        let existing = match nodes.get(&key) {
            Some(Node::File(file)) => Some(Arc::clone(file)),
            _ => None,
        };

        let file = match (existing, mode.disposition) {
            (Some(_), OpenDisposition::CreateNoOverwrite) => {
                return Err(VfsError::AlreadyExists(path.to_string()));
            }
            (Some(file), OpenDisposition::CreateOverwrite) => {
                file.data.write().clear();
                file.touch();
                file
            }
            (Some(file), _) => file,
            (None, _) if !mode.creates_missing() => {
                return Err(VfsError::NotFound(path.to_string()));
            }
            (None, _) => {
                Self::ensure_parents(&mut nodes, &key, path)?;
                let file = FileNode::new(Vec::new());
                nodes.insert(key.clone(), Node::File(Arc::clone(&file)));
                debug!("{}: created {key}", self.name);
                file
            }
        };

        Ok(Box::new(MemoryFile {
            name: key.rsplit('/').next().unwrap_or_default().to_string(),
            node: file,
            pos: 0,
            readable: mode.access.read,
            writable: mode.access.write,
        }))
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.check_writable(path)?;
        let key = self.key_for(path)?;
        if key.is_empty() {
            return Err(VfsError::AccessDenied(format!(
                "refusing to delete the root of {}",
                self.name
            )));
        }

        let mut nodes = self.nodes.write();
        match nodes.remove(&key) {
            Some(Node::Directory) => {
                for child in Self::descendants(&nodes, &key) {
                    nodes.remove(&child);
                }
                Ok(())
            }
            Some(Node::File(_)) => Ok(()),
            None => Err(VfsError::NotFound(path.to_string())),
        }
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        self.check_writable(src)?;
        let from = self.key_for(src)?;
        let to = self.key_for(dst)?;
        if from.is_empty() || to.is_empty() {
            return Err(VfsError::InvalidPath(format!("cannot rename {src} to {dst}")));
        }
        if to.starts_with(&format!("{from}/")) {
            return Err(VfsError::InvalidPath(format!("{dst} lies inside {src}")));
        }

        let mut nodes = self.nodes.write();
        let parent_exists = to
            .rfind('/')
            .is_none_or(|index| Self::is_dir(&nodes, &to[..index]));
        if !parent_exists {
            return Err(VfsError::NotFound(dst.to_string()));
        }
        if matches!(nodes.get(&to), Some(Node::Directory)) {
            return Err(VfsError::AlreadyExists(dst.to_string()));
        }

        let node = nodes
            .remove(&from)
            .ok_or_else(|| VfsError::NotFound(src.to_string()))?;

        if matches!(node, Node::Directory) {
            for child in Self::descendants(&nodes, &from) {
                if let Some(moved) = nodes.remove(&child) {
                    let renamed = format!("{to}{}", &child[from.len()..]);
                    nodes.insert(renamed, moved);
                }
            }
        }
        nodes.insert(to, node);
        Ok(())
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        self.check_writable(path)?;
        self.insert_dir(path)
    }

    fn query_stats(&self, path: &str) -> Result<FileStats> {
        let key = self.key_for(path)?;
        if key.is_empty() {
            return Ok(FileStats::directory());
        }

        let name = key.rsplit('/').next().unwrap_or_default();
        match self.nodes.read().get(&key) {
            Some(Node::File(file)) => Ok(file.stats(name)),
            Some(Node::Directory) => Ok(FileStats {
                is_hidden: is_dot_hidden(name),
                ..FileStats::directory()
            }),
            None => Err(VfsError::NotFound(path.to_string())),
        }
    }

    fn begin_listing(&self, dir: &str, pattern: &str, filter: &ScanFilter) -> Result<DirIter> {
        let key = self.key_for(dir)?;
        let nodes = self.nodes.read();
        if !Self::is_dir(&nodes, &key) {
            return Err(VfsError::NotFound(dir.to_string()));
        }

        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };

        let entries = nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter_map(|(k, node)| {
                let name = &k[prefix.len()..];
                if name.contains('/') {
                    return None;
                }
                let stats = match node {
                    Node::File(file) => file.stats(name),
                    Node::Directory => FileStats {
                        is_hidden: is_dot_hidden(name),
                        ..FileStats::directory()
                    },
                };
                Some(DirEntry::new(name, stats))
            })
            .collect();

        Ok(filter_scan(entries, pattern, filter, true))
    }

    fn is_case_sensitive(&self) -> bool {
        true
    }
}

/// Open handle on a memory file.
#[derive(Debug)]
pub struct MemoryFile {
    name: String,
    node: Arc<FileNode>,
    pos: u64,
    readable: bool,
    writable: bool,
}

fn position_too_large(name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{name}: position too large"),
    )
}

/// Zero-extend `data` to `len` bytes without aborting on exhaustion.
fn grow(data: &mut Vec<u8>, len: usize) -> io::Result<()> {
    data.try_reserve(len - data.len())
        .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
    data.resize(len, 0);
    Ok(())
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.readable {
            return Err(write_only_error(&self.name));
        }

        let data = self.node.data.read();
        let start = usize::try_from(self.pos).unwrap_or(usize::MAX).min(data.len());
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);
        self.pos += count as u64;
        Ok(count)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(read_only_error(&self.name));
        }

        let start = usize::try_from(self.pos).map_err(|_| position_too_large(&self.name))?;
        let end = start
            .checked_add(buf.len())
            .ok_or_else(|| position_too_large(&self.name))?;
        let mut data = self.node.data.write();
        if data.len() < end {
            grow(&mut data, end)?;
        }
        data[start..end].copy_from_slice(buf);
        drop(data);

        self.node.touch();
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.node.data.read().len() as u64;
        self.pos = seek_position(self.pos, len, pos)?;
        Ok(self.pos)
    }
}

impl VfsFile for MemoryFile {
    fn size(&self) -> Result<u64> {
        Ok(self.node.data.read().len() as u64)
    }

    fn set_end(&mut self) -> Result<()> {
        if !self.writable {
            return Err(io_error(read_only_error(&self.name), &self.name));
        }
        let end = usize::try_from(self.pos).map_err(|_| position_too_large(&self.name))?;
        let mut data = self.node.data.write();
        if data.len() < end {
            grow(&mut data, end)?;
        } else {
            data.truncate(end);
        }
        drop(data);
        self.node.touch();
        Ok(())
    }

    fn is_readable(&self) -> bool {
        self.readable
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn stats(&self) -> Result<FileStats> {
        Ok(self.node.stats(&self.name))
    }

    fn set_times(&mut self, time: SystemTime) -> Result<()> {
        *self.node.modified.lock() = time;
        Ok(())
    }

    fn create_mapping(&self) -> Result<Box<dyn MappingProvider>> {
        Ok(Box::new(MemoryMappingProvider {
            node: Arc::clone(&self.node),
            regions: BTreeMap::new(),
        }))
    }
}

struct CopiedRegion {
    offset: usize,
    data: Box<[u8]>,
    writable: bool,
    write_back: bool,
}

struct MemoryMappingProvider {
    node: Arc<FileNode>,
    regions: BTreeMap<MapAddress, CopiedRegion>,
}

impl MemoryMappingProvider {
    fn write_back(&self, region: &CopiedRegion) {
        if !region.write_back {
            return;
        }

        let mut data = self.node.data.write();
        if region.offset >= data.len() {
            return;
        }
        let count = region.data.len().min(data.len() - region.offset);
        data[region.offset..region.offset + count].copy_from_slice(&region.data[..count]);
        drop(data);
        self.node.touch();
    }
}

impl MappingProvider for MemoryMappingProvider {
    fn map_region(&mut self, offset: u64, len: usize, access: MapAccess) -> Result<MapAddress> {
        let data = self.node.data.read();
        check_bounds(offset, len, data.len() as u64)?;
        if !access.read && !access.write {
            return Err(VfsError::AccessDenied(
                "handle is neither readable nor writable".to_string(),
            ));
        }

        // Bounds were checked against a usize length
        let start = offset as usize;
        let copy: Box<[u8]> = data[start..start + len].into();
        drop(data);

        let address = MapAddress::of(&copy);
        self.regions.insert(
            address,
            CopiedRegion {
                offset: start,
                data: copy,
                writable: access.write || access.private,
                write_back: access.write && !access.private,
            },
        );
        Ok(address)
    }

    fn unmap_region(&mut self, address: MapAddress) -> bool {
        match self.regions.remove(&address) {
            Some(region) => {
                self.write_back(&region);
                true
            }
            None => false,
        }
    }

    fn region(&self, address: MapAddress) -> Option<&[u8]> {
        self.regions.get(&address).map(|region| &region.data[..])
    }

    fn region_mut(&mut self, address: MapAddress) -> Option<&mut [u8]> {
        self.regions
            .get_mut(&address)
            .filter(|region| region.writable)
            .map(|region| &mut region.data[..])
    }

    fn region_count(&self) -> usize {
        self.regions.len()
    }
}

impl Drop for MemoryMappingProvider {
    fn drop(&mut self) {
        for region in self.regions.values() {
            self.write_back(region);
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::translator::FileAccess;

    fn read_all(translator: &MemoryTranslator, path: &str) -> String {
        let mut file = translator.open(path, &OpenMode::READ).expect("open");
        let mut text = String::new();
        file.read_to_string(&mut text).expect("read");
        text
    }

    #[test]
    fn test_insert_and_read() {
        let translator = MemoryTranslator::new();
        translator.insert_file("//docs/a.txt", "alpha").expect("insert");

        assert_eq!(read_all(&translator, "//docs/a.txt"), "alpha");
        assert_eq!(read_all(&translator, "docs/a.txt"), "alpha");
        assert_eq!(read_all(&translator, "/docs/a.txt"), "alpha");
        assert!(translator.contains("//docs"));
    }

    #[test]
    fn test_root_scoping() {
        let translator = MemoryTranslator::new().with_root("/srv/app");
        translator.insert_file("//a.txt", "a").expect("insert");

        assert!(translator.open("/srv/app/a.txt", &OpenMode::READ).is_ok());
        assert!(matches!(
            translator.open("/etc/a.txt", &OpenMode::READ),
            Err(VfsError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_writes_are_shared_between_handles() {
        let translator = MemoryTranslator::new();
        let mut writer = translator
            .open("//log.txt", &OpenMode::WRITE_TRUNCATE)
            .expect("create");
        writer.write_all(b"one").expect("write");

        assert_eq!(read_all(&translator, "//log.txt"), "one");
        assert_eq!(translator.file_contents("//log.txt"), Some(b"one".to_vec()));
    }

    #[test]
    fn test_dispositions() {
        let translator = MemoryTranslator::new();
        translator.insert_file("//a", "data").expect("insert");

        let exclusive = OpenMode {
            access: FileAccess::WRITE,
            disposition: OpenDisposition::CreateNoOverwrite,
        };
        assert!(matches!(
            translator.open("//a", &exclusive),
            Err(VfsError::AlreadyExists(_))
        ));
        assert!(translator.open("//b", &exclusive).is_ok());

        assert!(matches!(
            translator.open("//missing", &OpenMode::READ),
            Err(VfsError::NotFound(_))
        ));

        let overwrite = translator
            .open("//a", &OpenMode::WRITE_TRUNCATE)
            .expect("overwrite");
        assert_eq!(overwrite.size().expect("size"), 0);
    }

    #[test]
    fn test_read_only_translator() {
        let translator = MemoryTranslator::new().read_only();
        translator.insert_file("//a", "data").expect("insert");

        assert!(translator.open("//a", &OpenMode::READ).is_ok());
        assert!(translator.open("//a", &OpenMode::WRITE_TRUNCATE).is_err());
        assert!(translator.delete("//a").is_err());
        assert!(translator.create_dir("//d").is_err());
    }

    #[test]
    fn test_handle_access_enforced() {
        let translator = MemoryTranslator::new();
        translator.insert_file("//a", "data").expect("insert");

        let mut reader = translator.open("//a", &OpenMode::READ).expect("open");
        assert!(reader.write(b"x").is_err());
        assert!(reader.set_end().is_err());
    }

    #[test]
    fn test_delete_directory_tree() {
        let translator = MemoryTranslator::new();
        translator.insert_file("//d/x/1", "1").expect("insert");
        translator.insert_file("//d/2", "2").expect("insert");
        translator.insert_file("//dz", "keep").expect("insert");

        translator.delete("//d").expect("delete");
        assert!(!translator.contains("//d/x/1"));
        assert!(!translator.contains("//d"));
        assert!(translator.contains("//dz"));
        assert!(translator.delete("//").is_err());
    }

    #[test]
    fn test_rename_moves_children() {
        let translator = MemoryTranslator::new();
        translator.insert_file("//src/a", "a").expect("insert");
        translator.insert_dir("//dst").expect("mkdir");

        translator.rename("//src", "//dst/moved").expect("rename");
        assert_eq!(read_all(&translator, "//dst/moved/a"), "a");
        assert!(!translator.contains("//src"));

        assert!(translator.rename("//nope", "//x").is_err());
        assert!(translator.rename("//dst", "//dst/inner").is_err());
        assert!(translator.rename("//dst/moved/a", "//no/parent").is_err());
    }

    #[test]
    fn test_listing_children_only() {
        let translator = MemoryTranslator::new();
        translator.insert_file("//d/a.txt", "a").expect("insert");
        translator.insert_file("//d/sub/b.txt", "b").expect("insert");
        translator.insert_file("//d/.hidden", "h").expect("insert");

        let filter = ScanFilter {
            no_current_dir_desc: true,
            no_parent_dir_desc: true,
            ..ScanFilter::default()
        };
        let names: Vec<String> = translator
            .begin_listing("//d/", "*", &filter)
            .expect("listing")
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec![".hidden", "a.txt", "sub"]);

        assert!(translator.begin_listing("//d/a.txt/", "*", &filter).is_err());
        assert!(translator.begin_listing("//nope/", "*", &filter).is_err());
    }

    #[test]
    fn test_shared_mapping_writes_back() {
        let translator = MemoryTranslator::new();
        translator.insert_file("//m", "abcdef").expect("insert");
        let mode = OpenMode {
            access: FileAccess::READ_WRITE,
            disposition: OpenDisposition::OpenExisting,
        };
        let file = translator.open("//m", &mode).expect("open");
        let mut provider = file.create_mapping().expect("provider");

        let shared = MapAccess {
            read: true,
            write: true,
            private: false,
        };
        let address = provider.map_region(1, 2, shared).expect("map");
        provider.region_mut(address).expect("writable").copy_from_slice(b"XY");
        assert!(provider.unmap_region(address));
        assert_eq!(translator.file_contents("//m"), Some(b"aXYdef".to_vec()));

        let private = MapAccess {
            private: true,
            ..shared
        };
        let address = provider.map_region(0, 1, private).expect("map");
        provider.region_mut(address).expect("writable")[0] = b'Z';
        drop(provider);
        assert_eq!(translator.file_contents("//m"), Some(b"aXYdef".to_vec()));
    }

    fn engine_on(translator: &Arc<MemoryTranslator>, path: &str) -> crate::FileEngine {
        let vfs = crate::Vfs::new(crate::VfsConfig::default()).expect("layer");
        vfs.register_translator(Arc::clone(translator) as Arc<dyn Translator>);
        let engine = vfs.create_engine(path).expect("engine");
        assert!(engine.open(crate::OpenFlags::READ_WRITE | crate::OpenFlags::EXISTING_ONLY));
        engine
    }

    #[test]
    fn test_resize_past_addressable_range_fails() {
        let translator = Arc::new(MemoryTranslator::new());
        translator.insert_file("//a.bin", "abc").expect("insert");
        let engine = engine_on(&translator, "//a.bin");

        assert!(!engine.set_size(u64::MAX));
        assert!(engine.seek(0));
        assert!(engine.set_size(1));
        assert_eq!(translator.file_contents("//a.bin"), Some(b"a".to_vec()));
    }

    #[test]
    fn test_write_at_overflowing_position_fails() {
        let translator = Arc::new(MemoryTranslator::new());
        translator.insert_file("//a.bin", "abc").expect("insert");
        let engine = engine_on(&translator, "//a.bin");

        assert!(engine.seek(u64::MAX - 1));
        assert_eq!(engine.write(b"xyz"), 0);
        assert_eq!(translator.file_contents("//a.bin"), Some(b"abc".to_vec()));

        assert!(engine.seek(5));
        assert_eq!(engine.write(b"z"), 1);
        assert_eq!(
            translator.file_contents("//a.bin"),
            Some(b"abc\0\0z".to_vec())
        );
    }
}
