//! Process-scoped layer state
//!
//! One [`Vfs`] holds the translator registry, the "layer active" flag and
//! the set of live file engines behind a single coarse lock. Routed
//! operations copy the registry out of the lock and run their translator
//! calls without holding it, so a blocking backend never stalls
//! registration.

use crate::engine::{EngineState, FileEngine};
use crate::listing::{self, EntryList, ListFilter};
use crate::path::PathResolver;
use crate::registry::TranslatorRegistry;
use crate::translator::Translator;
use crate::{Result, VfsConfig};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

struct VfsState {
    active: bool,
    registry: TranslatorRegistry,
    engines: Vec<Weak<Mutex<EngineState>>>,
}

/// Virtual filesystem layer.
pub struct Vfs {
    config: VfsConfig,
    resolver: PathResolver,
    state: Mutex<VfsState>,
}

impl fmt::Debug for Vfs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Vfs")
            .field("active", &state.active)
            .field("registry", &state.registry)
            .field("engines", &state.engines.len())
            .finish_non_exhaustive()
    }
}

impl Vfs {
    /// Create an active layer with an empty registry.
    pub fn new(config: VfsConfig) -> Result<Arc<Self>> {
        config.validate()?;

        let resolver = PathResolver::new(
            config.app_root.clone(),
            config.root_marker.clone(),
            config.case_sensitive,
        );

        info!(
            "Filesystem layer created (app root: {:?}, case sensitive: {})",
            config.app_root, config.case_sensitive
        );

        Ok(Arc::new(Self {
            config,
            resolver,
            state: Mutex::new(VfsState {
                active: true,
                registry: TranslatorRegistry::new(),
                engines: Vec::new(),
            }),
        }))
    }

    /// Layer configuration.
    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    /// Path resolver derived from the configuration.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Append a translator to the resolution chain.
    ///
    /// Registering a translator that is already present changes nothing.
    pub fn register_translator(&self, translator: Arc<dyn Translator>) -> bool {
        let name = translator.name().to_string();
        let added = self.state.lock().registry.register(translator);
        if added {
            info!("Registered translator '{name}'");
        } else {
            debug!("Translator '{name}' is already registered");
        }
        added
    }

    /// Remove a translator from the resolution chain.
    ///
    /// Engines that already hold a handle from it keep working.
    pub fn unregister_translator(&self, translator: &Arc<dyn Translator>) -> bool {
        let removed = self.state.lock().registry.unregister(translator);
        if removed {
            info!("Unregistered translator '{}'", translator.name());
        }
        removed
    }

    /// Copy of the resolution chain; empty while the layer is inactive.
    pub fn translators(&self) -> Vec<Arc<dyn Translator>> {
        self.chain().unwrap_or_default()
    }

    /// Resolution chain, or `None` while the layer is inactive.
    pub(crate) fn chain(&self) -> Option<Vec<Arc<dyn Translator>>> {
        let state = self.state.lock();
        state.active.then(|| state.registry.snapshot())
    }

    /// Number of registered translators.
    pub fn translator_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Whether routed operations are served.
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Start serving routed operations.
    pub fn activate(&self) {
        let mut state = self.state.lock();
        if !state.active {
            state.active = true;
            info!("Filesystem layer activated");
        }
    }

    /// Stop serving routed operations.
    ///
    /// Every live engine releases its mapping provider and then its handle.
    /// Engines stay usable objects but behave as if no translator could
    /// serve them until the layer is activated again.
    pub fn deactivate(&self) {
        let engines = {
            let mut state = self.state.lock();
            if !state.active {
                return;
            }
            state.active = false;
            std::mem::take(&mut state.engines)
        };

        let mut closed = 0;
        let mut survivors = Vec::with_capacity(engines.len());
        for engine in engines {
            if let Some(live) = engine.upgrade() {
                live.lock().release();
                closed += 1;
                survivors.push(engine);
            }
        }

        self.state.lock().engines.extend(survivors);
        info!("Filesystem layer deactivated, released {closed} engines");
    }

    /// Create a file engine for `path`.
    ///
    /// Returns `None` while the layer is inactive and for paths that belong
    /// to the host's own resource system.
    pub fn create_engine(self: &Arc<Self>, path: &str) -> Option<FileEngine> {
        if !self.is_active() {
            return None;
        }
        if !self.config.reserved_prefix.is_empty() && path.starts_with(&self.config.reserved_prefix)
        {
            debug!("Not routing reserved path {path}");
            return None;
        }

        let engine = FileEngine::new(Arc::clone(self), path);

        let mut state = self.state.lock();
        state.engines.retain(|weak| weak.strong_count() > 0);
        state.engines.push(engine.downgrade());
        Some(engine)
    }

    /// Number of engines that are still alive.
    pub fn live_engine_count(&self) -> usize {
        self.state
            .lock()
            .engines
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Merged listing of a directory across every translator.
    pub fn list<S: AsRef<str>>(&self, dir: &str, filters: ListFilter, patterns: &[S]) -> EntryList {
        let translators = self.translators();
        let resolved = self.resolver.resolve_dir(dir);
        listing::list_directory(&translators, &resolved, filters, patterns)
    }

    /// Create a directory through the first translator.
    ///
    /// Parent directories are always created.
    pub fn mkdir(&self, dir: &str) -> bool {
        let Some(first) = self.translators().into_iter().next() else {
            return false;
        };

        let resolved = self.resolver.resolve(dir);
        first
            .create_dir(resolved.as_str())
            .inspect_err(|e| debug!("Translator '{}' declined mkdir {resolved}: {e}", first.name()))
            .is_ok()
    }

    /// Delete a directory from every translator; true if any succeeded.
    pub fn rmdir(&self, dir: &str) -> bool {
        let resolved = self.resolver.resolve(dir);
        remove_from_all(&self.translators(), resolved.as_str())
    }

    /// Process-wide case policy; `false` while inactive.
    pub fn case_sensitive(&self) -> bool {
        self.is_active() && self.config.case_sensitive
    }
}

/// Delete `path` from every translator; true if any accepted.
pub(crate) fn remove_from_all(translators: &[Arc<dyn Translator>], path: &str) -> bool {
    let mut removed = false;
    for translator in translators {
        match translator.delete(path) {
            Ok(()) => {
                debug!("Translator '{}' deleted {path}", translator.name());
                removed = true;
            }
            Err(e) => debug!("Translator '{}' declined delete {path}: {e}", translator.name()),
        }
    }
    removed
}
