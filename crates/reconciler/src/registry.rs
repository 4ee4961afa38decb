//! Registered-state table: the instances the process believes are monitored.

use common::{InstanceId, Port};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Mutex-guarded `InstanceId -> Port` table.
///
/// All mutation goes through atomic insert/remove, only after the
/// corresponding convergence action succeeded. Convergence workers never
/// hold the lock across an await point. In-memory only: a restart forgets
/// it and the next pass re-derives correctness from the backend.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<HashMap<InstanceId, Port>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<InstanceId, Port>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an instance as monitored.
    pub fn insert(&self, id: InstanceId, port: Port) {
        debug!(instance = %id, port = %port, "registering instance");
        self.lock().insert(id, port);
    }

    /// Forget an instance. Returns its port if it was registered.
    pub fn remove(&self, id: &InstanceId) -> Option<Port> {
        let removed = self.lock().remove(id);
        if removed.is_some() {
            debug!(instance = %id, "deregistered instance");
        }
        removed
    }

    pub fn get(&self, id: &InstanceId) -> Option<Port> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &InstanceId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Consistent copy of the whole table.
    pub fn snapshot(&self) -> HashMap<InstanceId, Port> {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_snapshot() {
        let registry = Registry::new();
        assert!(registry.is_empty());

        registry.insert(InstanceId::new("game01"), Port::new("4001"));
        registry.insert(InstanceId::new("game02"), Port::new("4002"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(&InstanceId::new("game01")), Some(Port::new("4001")));

        let removed = registry.remove(&InstanceId::new("game01"));
        assert_eq!(removed, Some(Port::new("4001")));
        assert!(!registry.contains(&InstanceId::new("game01")));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(&InstanceId::new("game02")), Some(&Port::new("4002")));
    }

    #[test]
    fn remove_of_unknown_instance_is_none() {
        let registry = Registry::new();
        assert_eq!(registry.remove(&InstanceId::new("game99")), None);
    }

    #[test]
    fn insert_overwrites_existing_port() {
        let registry = Registry::new();
        registry.insert(InstanceId::new("game01"), Port::new("4001"));
        registry.insert(InstanceId::new("game01"), Port::new("4009"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&InstanceId::new("game01")), Some(Port::new("4009")));
    }
}
