//! Virtual filesystem routing layer.
//!
//! Every file request a host makes (open, read, write, seek, stat, list,
//! delete, rename, map) is resolved against an ordered chain of pluggable
//! backing stores called *translators*: a directory tree on disk, an
//! archive baked into the executable, an in-memory overlay. The caller sees
//! one uniform file object regardless of which translator serves it.
//!
//! - [`Vfs`]: process-scoped layer state (translator registry, active flag,
//!   live adapters) behind a single coarse lock
//! - [`FileEngine`]: the uniform file object, owning at most one native
//!   handle and one mapping provider
//! - [`listing`]: merged, deduplicated directory listings across translators
//! - [`embedded`]: registration of the archive embedded in the binary
//!
//! # Resolution order
//!
//! Translators are consulted front to back in registration order. For
//! `open`, `rename`, `stat` and `size` the first translator that succeeds
//! wins. `remove` and `rmdir` are applied to every translator and succeed
//! if any of them did. Listings merge all translators.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stratum_vfs::backend::LocalTranslator;
//! use stratum_vfs::{OpenFlags, Vfs, VfsConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let vfs = Vfs::new(VfsConfig::default())?;
//! vfs.register_translator(Arc::new(LocalTranslator::new("/srv/assets")?));
//!
//! if let Some(engine) = vfs.create_engine("//textures/readme.txt") {
//!     if engine.open(OpenFlags::READ) {
//!         let mut buf = vec![0u8; engine.size() as usize];
//!         engine.read(&mut buf);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]

use thiserror::Error;

// Concrete translators and file handles
pub mod backend;

// Configuration
pub mod config;

// Embedded archive bootstrap
pub mod embedded;

// Uniform file object
pub mod engine;

// Directory enumeration
pub mod listing;

// Memory mapping extension
pub mod mapping;

// Path resolution
pub mod path;

// Translator registry
pub mod registry;

// Backing store contract
pub mod translator;

// Layer state
mod vfs;

pub use config::VfsConfig;
pub use embedded::EmbeddedResources;
pub use engine::{FileEngine, FileFlags, FileNameKind, OpenFlags};
pub use listing::{EntryIterator, EntryList, ListFilter};
pub use mapping::{MapAddress, MapFlags, MappingProvider};
pub use path::{PathResolver, ResolvedPath};
pub use registry::TranslatorRegistry;
pub use translator::{
    DirEntry, DirIter, FileAccess, FileStats, ItemType, OpenDisposition, OpenMode, ScanFilter,
    Translator, VfsFile,
};
pub use vfs::Vfs;

/// Result type for filesystem operations.
pub type Result<T> = std::result::Result<T, VfsError>;

/// Errors reported by translators, file handles and mapping providers.
///
/// The router itself never surfaces these to the host: a failing
/// translator is treated exactly like a declining one, and the cause is
/// only recorded in the log.
#[derive(Debug, Error)]
pub enum VfsError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Path does not exist in this backing store.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Exclusive creation hit an existing entry.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Backing store refuses the access mode.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Path cannot be expressed inside this backing store.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Operation is not supported by this backing store.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// No file handle is held.
    #[error("File is not open")]
    NotOpen,

    /// Mapping could not be created or released.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Archive could not be opened.
    #[error("Archive error: {0}")]
    Archive(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Glob pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern as supplied by the caller
        pattern: String,
        /// Compiler message
        reason: String,
    },
}

/// Version information for the filesystem layer.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default marker that denotes "relative to the translator root".
///
/// A resolved path `//textures/a.png` asks each translator for
/// `textures/a.png` below its own root.
pub const DEFAULT_ROOT_MARKER: &str = "//";

/// Default prefix of paths owned by the host's own resource system.
pub const DEFAULT_RESERVED_PREFIX: &str = ":";

/// Default chunk size used when copying between two handles.
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 64 * 1024;
