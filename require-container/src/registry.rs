//! Export registry: maps requirement names to exports.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::trace;

use crate::error::{AlreadyRegisteredError, RequireError};
use crate::export::Export;

/// Stores all exports of a module.
///
/// Names are registered once and never overwritten. Registration
/// usually happens at startup; lookups are read-only afterwards.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    exports: DashMap<String, Arc<Export>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an export under its name.
    ///
    /// # Errors
    /// Returns [`RequireError::AlreadyRegistered`] if the name is taken.
    pub fn register(&self, export: Arc<Export>) -> Result<(), RequireError> {
        match self.exports.entry(export.name().to_string()) {
            Entry::Occupied(entry) => Err(RequireError::AlreadyRegistered(
                AlreadyRegisteredError {
                    name: entry.key().clone(),
                },
            )),
            Entry::Vacant(entry) => {
                entry.insert(export);
                Ok(())
            }
        }
    }

    /// Looks up an export by name.
    pub fn get(&self, name: &str) -> Option<Arc<Export>> {
        let export = self.exports.get(name).map(|entry| entry.value().clone());
        trace!(name, found = export.is_some(), "Registry lookup");
        export
    }

    pub fn contains(&self, name: &str) -> bool {
        self.exports.contains_key(name)
    }

    /// Returns the number of registered exports.
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    /// Returns all registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exports.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Returns all exports, sorted by name.
    pub fn exports(&self) -> Vec<Arc<Export>> {
        let mut exports: Vec<Arc<Export>> =
            self.exports.iter().map(|e| e.value().clone()).collect();
        exports.sort_by(|a, b| a.name().cmp(b.name()));
        exports
    }
}
