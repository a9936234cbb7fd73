//! Embedded archive bootstrap
//!
//! The build script can bake an archive into the library (see
//! `STRATUM_EMBED_ARCHIVE`). At startup [`EmbeddedResources::initialize`]
//! wraps that region in a read-only [`BufferFile`], asks an
//! [`ArchiveFormat`] to open it and registers the resulting translator.
//! Every failure on the way leaves the bootstrap inactive; startup
//! continues without the archive.

use crate::backend::BufferFile;
use crate::translator::Translator;
use crate::vfs::Vfs;
use crate::{Result, VfsError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

static EMBEDDED_ARCHIVE: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/embedded_archive.bin"));

/// Region baked into the binary at build time; empty when none was staged.
pub fn embedded_region() -> &'static [u8] {
    EMBEDDED_ARCHIVE
}

/// Opens an archive stored in a buffer as a translator.
///
/// Archive formats are provided by the host; this crate only supplies the
/// buffer.
pub trait ArchiveFormat {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Open `buffer` as an archive.
    fn open_archive(&self, buffer: BufferFile) -> Result<Arc<dyn Translator>>;
}

enum BootstrapState {
    Inactive,
    Active {
        vfs: Arc<Vfs>,
        translator: Arc<dyn Translator>,
    },
}

/// Lifecycle of the embedded archive translator.
pub struct EmbeddedResources {
    state: BootstrapState,
}

impl fmt::Debug for EmbeddedResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedResources")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Default for EmbeddedResources {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddedResources {
    /// Inactive bootstrap.
    pub const fn new() -> Self {
        Self {
            state: BootstrapState::Inactive,
        }
    }

    /// Open the region compiled into the binary with `format`.
    pub fn initialize_from_binary(&mut self, vfs: &Arc<Vfs>, format: &dyn ArchiveFormat) -> bool {
        self.initialize(vfs, embedded_region(), format)
    }

    /// Open `region` with `format` and register the archive.
    ///
    /// Returns whether the bootstrap is active afterwards. An empty region
    /// or an archive that fails to open leaves the registry untouched.
    pub fn initialize(
        &mut self,
        vfs: &Arc<Vfs>,
        region: &'static [u8],
        format: &dyn ArchiveFormat,
    ) -> bool {
        if self.is_active() {
            debug!("Embedded archive already registered");
            return true;
        }

        match Self::open(region, format) {
            Ok(translator) => {
                vfs.register_translator(Arc::clone(&translator));
                info!(
                    "Embedded {} archive registered ({} bytes)",
                    format.name(),
                    region.len()
                );
                self.state = BootstrapState::Active {
                    vfs: Arc::clone(vfs),
                    translator,
                };
                true
            }
            Err(e) => {
                debug!("Embedded archive stays inactive: {e}");
                false
            }
        }
    }

    fn open(region: &'static [u8], format: &dyn ArchiveFormat) -> Result<Arc<dyn Translator>> {
        if region.is_empty() {
            return Err(VfsError::Archive("no embedded data".to_string()));
        }

        let buffer = BufferFile::from_static("embedded", region);
        format.open_archive(buffer).inspect_err(|e| {
            warn!("Embedded data is not a valid {} archive: {e}", format.name());
        })
    }

    /// Unregister and release the archive. Does nothing while inactive.
    pub fn shutdown(&mut self) {
        if let BootstrapState::Active { vfs, translator } =
            std::mem::replace(&mut self.state, BootstrapState::Inactive)
        {
            vfs.unregister_translator(&translator);
            info!("Embedded archive released");
        }
    }

    /// Whether the archive is registered.
    pub fn is_active(&self) -> bool {
        matches!(self.state, BootstrapState::Active { .. })
    }

    /// The registered archive translator.
    pub fn translator(&self) -> Option<&Arc<dyn Translator>> {
        match &self.state {
            BootstrapState::Active { translator, .. } => Some(translator),
            BootstrapState::Inactive => None,
        }
    }
}

impl Drop for EmbeddedResources {
    fn drop(&mut self) {
        self.shutdown();
    }
}
