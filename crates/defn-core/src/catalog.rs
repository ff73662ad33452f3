//! Named collections of definition types.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::defn::DefnType;
use crate::error::DefnError;

/// A thread-safe name → definition type map, cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Arc<RwLock<BTreeMap<String, DefnType>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `defn` under its own name.
    pub fn register(&self, defn: &DefnType) -> Result<(), DefnError> {
        let mut entries = self.entries.write();
        if entries.contains_key(defn.name()) {
            return Err(DefnError::DuplicateDefinition {
                name: defn.name().to_string(),
            });
        }
        debug!(defn = %defn.name(), "catalogued");
        entries.insert(defn.name().to_string(), defn.clone());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<DefnType> {
        self.entries.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// A snapshot of the entries, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (String, DefnType)> {
        let snapshot: Vec<(String, DefnType)> = self
            .entries
            .read()
            .iter()
            .map(|(name, defn)| (name.clone(), defn.clone()))
            .collect();
        snapshot.into_iter()
    }
}
