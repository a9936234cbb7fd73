//! Command implementations
//!
//! The layer reports failure as `false`/empty values and logs the cause;
//! these wrappers turn that into `anyhow` errors for the exit code.

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use stratum_vfs::{
    FileEngine, FileFlags, FileNameKind, FileStats, ItemType, ListFilter, OpenFlags, Vfs,
};

/// Attribute selection for `ls`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub hidden: bool,
    pub dirs_only: bool,
    pub files_only: bool,
}

impl ListOptions {
    fn filters(self, case_sensitive: bool) -> ListFilter {
        let mut filters = if self.dirs_only {
            ListFilter::DIRS
        } else if self.files_only {
            ListFilter::FILES
        } else {
            ListFilter::ALL_ENTRIES
        };
        filters |= ListFilter::NO_DOT_AND_DOT_DOT;
        if self.hidden {
            filters |= ListFilter::HIDDEN;
        }
        if case_sensitive {
            filters |= ListFilter::CASE_SENSITIVE;
        }
        filters
    }
}

fn engine(vfs: &Arc<Vfs>, path: &str) -> Result<FileEngine> {
    vfs.create_engine(path)
        .with_context(|| format!("Path {path} is not routed through the layer"))
}

/// Merged listing of `dir`.
pub fn list(
    vfs: &Arc<Vfs>,
    dir: &str,
    patterns: &[String],
    options: ListOptions,
) -> Result<Vec<String>> {
    let engine = engine(vfs, dir)?;
    if !engine.file_flags().contains(FileFlags::DIRECTORY) {
        bail!("{dir} is not a directory in any mount");
    }
    let filters = options.filters(vfs.case_sensitive());
    Ok(engine
        .entry_list(filters, patterns)
        .iter()
        .cloned()
        .collect())
}

/// Stream a file into `out`.
pub fn cat(vfs: &Arc<Vfs>, path: &str, out: &mut impl Write) -> Result<u64> {
    let engine = engine(vfs, path)?;
    if !engine.open(OpenFlags::READ | OpenFlags::EXISTING_ONLY) {
        bail!("Cannot open {path}");
    }

    let mut buffer = vec![0u8; vfs.config().copy_buffer_size];
    let mut total = 0u64;
    loop {
        let count = engine.read(&mut buffer);
        if count == 0 {
            break;
        }
        out.write_all(&buffer[..count])?;
        total += count as u64;
    }
    if !engine.at_end() {
        bail!("Read of {path} stopped at byte {total}");
    }
    out.flush()?;
    Ok(total)
}

/// What the first answering mount reports for a path.
#[derive(Debug, Clone)]
pub struct StatReport {
    pub path: String,
    pub absolute: String,
    pub flags: FileFlags,
    pub stats: FileStats,
}

fn epoch_seconds(time: Option<SystemTime>) -> Option<u64> {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
}

const fn kind_name(item_type: ItemType) -> &'static str {
    match item_type {
        ItemType::File => "file",
        ItemType::Directory => "directory",
        ItemType::Other => "other",
    }
}

impl StatReport {
    /// JSON rendering for `stat --json`.
    pub fn to_json(&self) -> Value {
        json!({
            "path": self.path,
            "absolute": self.absolute,
            "type": kind_name(self.stats.item_type),
            "size": self.stats.size,
            "hidden": self.stats.is_hidden,
            "link": self.stats.is_link,
            "modified": epoch_seconds(self.stats.modified),
            "created": epoch_seconds(self.stats.created),
        })
    }
}

impl fmt::Display for StatReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Path:     {}", self.path)?;
        writeln!(f, "Absolute: {}", self.absolute)?;
        writeln!(f, "Type:     {}", kind_name(self.stats.item_type))?;
        writeln!(f, "Size:     {}", self.stats.size)?;
        writeln!(f, "Flags:    {:?}", self.flags)?;
        if let Some(secs) = epoch_seconds(self.stats.modified) {
            writeln!(f, "Modified: {secs}")?;
        }
        Ok(())
    }
}

/// Stats of `path`.
pub fn stat(vfs: &Arc<Vfs>, path: &str) -> Result<StatReport> {
    let engine = engine(vfs, path)?;
    let stats = engine
        .stat()
        .with_context(|| format!("{path} does not exist in any mount"))?;
    Ok(StatReport {
        path: path.to_string(),
        absolute: engine.file_name(FileNameKind::Absolute),
        flags: FileFlags::from_stats(&stats),
        stats,
    })
}

/// Copy `source` to `dest`, possibly across mounts.
pub fn copy(vfs: &Arc<Vfs>, source: &str, dest: &str) -> Result<()> {
    if !engine(vfs, source)?.copy(dest) {
        bail!("Cannot copy {source} to {dest}");
    }
    Ok(())
}

/// Rename `source` to `dest` in the first mount that accepts it.
pub fn rename(vfs: &Arc<Vfs>, source: &str, dest: &str) -> Result<()> {
    if !engine(vfs, source)?.rename(dest) {
        bail!("Cannot rename {source} to {dest}");
    }
    Ok(())
}

/// Remove `path` from every mount.
pub fn remove(vfs: &Arc<Vfs>, path: &str) -> Result<()> {
    if !engine(vfs, path)?.remove() {
        bail!("Cannot remove {path}");
    }
    Ok(())
}

/// Create `dir` in the first mount.
pub fn mkdir(vfs: &Arc<Vfs>, dir: &str) -> Result<()> {
    if !engine(vfs, dir)?.mkdir(dir, true) {
        bail!("Cannot create directory {dir}");
    }
    Ok(())
}

/// Remove `dir` from every mount.
pub fn rmdir(vfs: &Arc<Vfs>, dir: &str) -> Result<()> {
    if !engine(vfs, dir)?.rmdir(dir, false) {
        bail!("Cannot remove directory {dir}");
    }
    Ok(())
}
