//! Ordered set of active translators.
//!
//! Registration order is resolution priority: the front entry is tried
//! first for every routed operation. Identity is pointer identity of the
//! shared translator, so registering the same translator twice is a no-op.

use crate::translator::Translator;
use std::sync::Arc;
use tracing::debug;

/// Ordered, duplicate-free list of translators.
#[derive(Default, Clone)]
pub struct TranslatorRegistry {
    translators: Vec<Arc<dyn Translator>>,
}

impl std::fmt::Debug for TranslatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorRegistry")
            .field(
                "translators",
                &self.translators.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl TranslatorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a translator unless it is already present.
    ///
    /// Returns `true` if the registry changed.
    pub fn register(&mut self, translator: Arc<dyn Translator>) -> bool {
        if self.contains(&translator) {
            return false;
        }

        debug!("Registering translator '{}'", translator.name());
        self.translators.push(translator);
        true
    }

    /// Remove the first entry identical to `translator`.
    ///
    /// Returns `true` if an entry was removed. Remaining entries keep their
    /// relative order.
    pub fn unregister(&mut self, translator: &Arc<dyn Translator>) -> bool {
        let Some(index) = self.position(translator) else {
            return false;
        };

        let removed = self.translators.remove(index);
        debug!("Unregistered translator '{}'", removed.name());
        true
    }

    /// Whether `translator` is registered.
    pub fn contains(&self, translator: &Arc<dyn Translator>) -> bool {
        self.position(translator).is_some()
    }

    /// Visit translators front to back.
    pub fn for_each_in_order(&self, mut visitor: impl FnMut(&Arc<dyn Translator>)) {
        for translator in &self.translators {
            visitor(translator);
        }
    }

    /// Iterate translators front to back.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Translator>> {
        self.translators.iter()
    }

    /// Highest-priority translator.
    pub fn first(&self) -> Option<&Arc<dyn Translator>> {
        self.translators.first()
    }

    /// Number of registered translators.
    pub fn len(&self) -> usize {
        self.translators.len()
    }

    /// Whether no translator is registered.
    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.translators.clear();
    }

    /// Copy of the current resolution chain.
    ///
    /// Routed operations iterate a snapshot so that no lock is held while a
    /// translator blocks on its storage medium.
    pub fn snapshot(&self) -> Vec<Arc<dyn Translator>> {
        self.translators.clone()
    }

    // Compare data pointers only; vtable pointers of the same object may differ
    // between codegen units.
    fn position(&self, translator: &Arc<dyn Translator>) -> Option<usize> {
        let needle = Arc::as_ptr(translator).cast::<()>();
        self.translators
            .iter()
            .position(|t| std::ptr::eq(Arc::as_ptr(t).cast::<()>(), needle))
    }
}
