// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::backends::store::load_artifact;
use crate::errors::{IterationError, StoreError};
use crate::model::Iteration;
use crate::traits::{ArtifactKind, TraceStore};

/// Iterations known to one manager, keyed by name.
///
/// Seeded from the iteration artifacts already in the store. Creation is
/// serialized through [`IterationRegistry::creation`] so two callers cannot
/// both pass the duplicate check for the same name.
#[derive(Default)]
pub struct IterationRegistry {
    iterations: RwLock<BTreeMap<String, Arc<Iteration>>>,
    creating: Mutex<()>,
}

impl IterationRegistry {
    pub fn load(store: &dyn TraceStore) -> Result<Self, IterationError> {
        let mut iterations = BTreeMap::new();
        for name in store.artifact_iterations(ArtifactKind::Iteration)? {
            let iteration: Iteration = load_artifact(store, &name, ArtifactKind::Iteration)?;
            iterations.insert(name, Arc::new(iteration));
        }
        Ok(Self {
            iterations: RwLock::new(iterations),
            creating: Mutex::new(()),
        })
    }

    /// Guard held for the whole check-persist-insert sequence of a creation.
    pub fn creation(&self) -> Result<MutexGuard<'_, ()>, IterationError> {
        self.creating
            .lock()
            .map_err(|_| IterationError::Store(StoreError::LockPoisoned))
    }

    pub fn get(&self, name: &str) -> Result<Option<Arc<Iteration>>, IterationError> {
        Ok(self
            .iterations
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .get(name)
            .cloned())
    }

    pub fn contains(&self, name: &str) -> Result<bool, IterationError> {
        Ok(self.get(name)?.is_some())
    }

    pub fn insert(&self, iteration: Arc<Iteration>) -> Result<(), IterationError> {
        self.iterations
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(iteration.name().to_string(), iteration);
        Ok(())
    }

    /// Names in lexicographic order.
    pub fn names(&self) -> Result<Vec<String>, IterationError> {
        Ok(self
            .iterations
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .keys()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::store::{save_artifact, MemoryTraceStore};
    use crate::model::EventSelection;

    #[test]
    fn test_registry_is_seeded_from_store() {
        let store = MemoryTraceStore::new();
        let iteration = Iteration::new("it0001".into(), EventSelection::new(), None, None);
        save_artifact(&store, "it0001", ArtifactKind::Iteration, &iteration).unwrap();

        let registry = IterationRegistry::load(&store).unwrap();
        assert_eq!(registry.names().unwrap(), vec!["it0001"]);
        assert_eq!(*registry.get("it0001").unwrap().unwrap(), iteration);
        assert!(registry.get("it0002").unwrap().is_none());
    }

    #[test]
    fn test_insert_and_list_sorted() {
        let registry = IterationRegistry::default();
        for name in ["b", "a"] {
            registry
                .insert(Arc::new(Iteration::new(name.into(), EventSelection::new(), None, None)))
                .unwrap();
        }
        assert_eq!(registry.names().unwrap(), vec!["a", "b"]);
        assert!(registry.contains("a").unwrap());
    }
}
