//! Resource store contract and an in-memory implementation.

use crate::error::StoreError;
use crate::types::{Resource, ResourceKey};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use tracing::debug;

/// Holds the current state of every resource.
///
/// Implementations replace-or-insert by `(namespace, resource_id)` and must
/// be safe for concurrent callers. Conflict resolution is theirs to decide.
pub trait ResourceStore: Send + Sync {
    fn upsert(&self, resource: Resource) -> Result<(), StoreError>;
}

/// In-memory resource store.
///
/// Rejects updates whose version is lower than the stored one, so versions
/// never go backwards for a key.
#[derive(Default)]
pub struct MemoryStore {
    resources: RwLock<HashMap<ResourceKey, Resource>>,

    /// Serializes writers so the version check and the insert are atomic.
    write_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the current resource.
    pub fn get(&self, key: &ResourceKey) -> Option<Resource> {
        self.resources.read().get(key).cloned()
    }

    /// All resources in a namespace, ordered by id.
    pub fn list(&self, namespace: &str) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self
            .resources
            .read()
            .values()
            .filter(|r| r.namespace == namespace)
            .cloned()
            .collect();
        resources.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
        resources
    }

    /// Remove a resource, returning it if it existed.
    pub fn remove(&self, key: &ResourceKey) -> Option<Resource> {
        let _lock = self.write_lock.lock();
        self.resources.write().remove(key)
    }

    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }
}

impl ResourceStore for MemoryStore {
    fn upsert(&self, resource: Resource) -> Result<(), StoreError> {
        let _lock = self.write_lock.lock();
        let key = resource.key();

        if let Some(current) = self.resources.read().get(&key) {
            if resource.resource_version < current.resource_version {
                return Err(StoreError::StaleVersion {
                    key,
                    current: current.resource_version,
                    attempted: resource.resource_version,
                });
            }
        }

        debug!(key = %key, version = resource.resource_version, "Upserting resource");
        self.resources.write().insert(key, resource);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upsert_and_get() {
        let store = MemoryStore::new();
        let resource = Resource::new("hub", "cluster1", "r1", 1).with_spec(json!({"a": 1}));

        store.upsert(resource.clone()).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&resource.key()), Some(resource));
    }

    #[test]
    fn test_upsert_replaces_same_key() {
        let store = MemoryStore::new();
        store.upsert(Resource::new("hub", "cluster1", "r1", 1)).unwrap();
        store
            .upsert(Resource::new("hub", "cluster1", "r1", 2).with_spec(json!({"b": 2})))
            .unwrap();

        let stored = store.get(&ResourceKey::new("cluster1", "r1")).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(stored.resource_version, 2);
        assert_eq!(stored.spec, json!({"b": 2}));
    }

    #[test]
    fn test_same_version_is_accepted() {
        let store = MemoryStore::new();
        store.upsert(Resource::new("hub", "cluster1", "r1", 3)).unwrap();
        store.upsert(Resource::new("hub", "cluster1", "r1", 3)).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_stale_version_rejected() {
        let store = MemoryStore::new();
        store.upsert(Resource::new("hub", "cluster1", "r1", 5)).unwrap();

        let result = store.upsert(Resource::new("hub", "cluster1", "r1", 4));
        assert!(matches!(
            result,
            Err(StoreError::StaleVersion {
                current: 5,
                attempted: 4,
                ..
            })
        ));

        let stored = store.get(&ResourceKey::new("cluster1", "r1")).unwrap();
        assert_eq!(stored.resource_version, 5);
    }

    #[test]
    fn test_namespaces_are_separate() {
        let store = MemoryStore::new();
        store.upsert(Resource::new("hub", "cluster1", "r2", 1)).unwrap();
        store.upsert(Resource::new("hub", "cluster1", "r1", 1)).unwrap();
        store.upsert(Resource::new("hub", "cluster2", "r1", 1)).unwrap();

        let ids: Vec<String> = store
            .list("cluster1")
            .into_iter()
            .map(|r| r.resource_id)
            .collect();
        assert_eq!(ids, vec!["r1", "r2"]);
        assert_eq!(store.list("cluster2").len(), 1);
    }

    #[test]
    fn test_remove() {
        let store = MemoryStore::new();
        store.upsert(Resource::new("hub", "cluster1", "r1", 1)).unwrap();

        let key = ResourceKey::new("cluster1", "r1");
        assert!(store.remove(&key).is_some());
        assert!(store.remove(&key).is_none());
        assert!(store.is_empty());
    }
}
