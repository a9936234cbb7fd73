//! Shared fixtures for integration tests
#![allow(dead_code, clippy::expect_used)]

use parking_lot::Mutex;
use std::sync::Arc;
use stratum_vfs::backend::MemoryTranslator;
use stratum_vfs::{
    DirIter, FileStats, OpenMode, Result, ScanFilter, Translator, Vfs, VfsConfig, VfsError, VfsFile,
};

/// Calls received by scripted translators, in order, as `name:operation`.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Translator operations that can be scripted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Open,
    Delete,
    Rename,
    CreateDir,
    Stats,
    Listing,
}

impl Op {
    fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Delete => "delete",
            Self::Rename => "rename",
            Self::CreateDir => "create_dir",
            Self::Stats => "stats",
            Self::Listing => "listing",
        }
    }
}

/// Memory-backed translator that records its calls and can be told to
/// decline individual operations.
pub struct ScriptedTranslator {
    name: String,
    inner: MemoryTranslator,
    declined: Mutex<Vec<Op>>,
    log: CallLog,
}

impl ScriptedTranslator {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            inner: MemoryTranslator::named(name),
            declined: Mutex::new(Vec::new()),
            log: Arc::clone(log),
        }
    }

    /// Add a file to the backing tree.
    #[must_use]
    pub fn with_file(self, path: &str, data: &str) -> Self {
        self.inner.insert_file(path, data).expect("insert");
        self
    }

    /// Decline `op` from now on.
    #[must_use]
    pub fn declining(self, op: Op) -> Self {
        self.declined.lock().push(op);
        self
    }

    /// Decline every operation.
    #[must_use]
    pub fn declining_all(self) -> Self {
        self.declined.lock().extend([
            Op::Open,
            Op::Delete,
            Op::Rename,
            Op::CreateDir,
            Op::Stats,
            Op::Listing,
        ]);
        self
    }

    pub fn backing(&self) -> &MemoryTranslator {
        &self.inner
    }

    fn enter(&self, op: Op) -> Result<()> {
        self.log.lock().push(format!("{}:{}", self.name, op.label()));
        if self.declined.lock().contains(&op) {
            return Err(VfsError::AccessDenied(format!(
                "{} declines {}",
                self.name,
                op.label()
            )));
        }
        Ok(())
    }
}

impl Translator for ScriptedTranslator {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, path: &str, mode: &OpenMode) -> Result<Box<dyn VfsFile>> {
        self.enter(Op::Open)?;
        self.inner.open(path, mode)
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.enter(Op::Delete)?;
        self.inner.delete(path)
    }

    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        self.enter(Op::Rename)?;
        self.inner.rename(src, dst)
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        self.enter(Op::CreateDir)?;
        self.inner.create_dir(path)
    }

    fn query_stats(&self, path: &str) -> Result<FileStats> {
        self.enter(Op::Stats)?;
        self.inner.query_stats(path)
    }

    fn begin_listing(&self, dir: &str, pattern: &str, filter: &ScanFilter) -> Result<DirIter> {
        self.enter(Op::Listing)?;
        self.inner.begin_listing(dir, pattern, filter)
    }

    fn is_case_sensitive(&self) -> bool {
        true
    }
}

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().clone()
}

pub fn clear(log: &CallLog) {
    log.lock().clear();
}

/// Layer with default configuration and the given chain.
pub fn layer(chain: &[Arc<dyn Translator>]) -> Arc<Vfs> {
    let vfs = Vfs::new(VfsConfig::default()).expect("layer");
    for translator in chain {
        vfs.register_translator(Arc::clone(translator));
    }
    vfs
}

/// Read a whole file through a fresh engine; `None` if it cannot be opened.
pub fn read_through(vfs: &Arc<Vfs>, path: &str) -> Option<String> {
    let engine = vfs.create_engine(path)?;
    if !engine.open(stratum_vfs::OpenFlags::READ) {
        return None;
    }

    let mut buf = vec![0u8; engine.size() as usize];
    let count = engine.read(&mut buf);
    buf.truncate(count);
    Some(String::from_utf8_lossy(&buf).into_owned())
}
