//! In-memory metadata store
//!
//! Backs dry runs of the operator and the reconciliation tests. It follows
//! the API server's rules: creates of an existing key fail, and an update
//! carrying a stale resource version is a conflict.

use super::{MetadataKind, MetadataObject, MetadataStore};
use crate::error::{MetadataError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

type ObjectKey = (MetadataKind, String, String);

#[derive(Default)]
struct Inner {
    objects: BTreeMap<ObjectKey, MetadataObject>,
    next_resource_version: u64,
    creates: usize,
    updates: usize,
}

impl Inner {
    fn bump(&mut self) -> String {
        self.next_resource_version += 1;
        self.next_resource_version.to_string()
    }
}

/// Metadata store keeping every object in process memory
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

fn key_of(object: &MetadataObject) -> ObjectKey {
    (object.kind(), object.namespace.clone(), object.name.clone())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly, bypassing the create counter
    pub async fn insert(&self, mut object: MetadataObject) -> MetadataObject {
        let mut inner = self.inner.write().await;
        object.resource_version = Some(inner.bump());
        inner.objects.insert(key_of(&object), object.clone());
        object
    }

    pub async fn object(&self, kind: MetadataKind, namespace: &str, name: &str) -> Option<MetadataObject> {
        let inner = self.inner.read().await;
        inner
            .objects
            .get(&(kind, namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// All stored objects, ordered by kind, namespace and name
    pub async fn objects(&self) -> Vec<MetadataObject> {
        self.inner.read().await.objects.values().cloned().collect()
    }

    pub async fn create_count(&self) -> usize {
        self.inner.read().await.creates
    }

    pub async fn update_count(&self) -> usize {
        self.inner.read().await.updates
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get(&self, kind: MetadataKind, namespace: &str, name: &str) -> Result<MetadataObject> {
        self.object(kind, namespace, name)
            .await
            .ok_or_else(|| MetadataError::NotFound(format!("{} {}/{}", kind, namespace, name)))
    }

    async fn create(&self, object: &MetadataObject) -> Result<MetadataObject> {
        let mut inner = self.inner.write().await;
        let key = key_of(object);
        if inner.objects.contains_key(&key) {
            return Err(MetadataError::AlreadyExists(format!(
                "{} {}/{}",
                key.0, key.1, key.2
            )));
        }
        let mut stored = object.clone();
        stored.resource_version = Some(inner.bump());
        inner.objects.insert(key, stored.clone());
        inner.creates += 1;
        Ok(stored)
    }

    async fn update(&self, object: &MetadataObject) -> Result<MetadataObject> {
        let mut inner = self.inner.write().await;
        let key = key_of(object);
        let current_version = match inner.objects.get(&key) {
            Some(current) => current.resource_version.clone(),
            None => {
                return Err(MetadataError::NotFound(format!(
                    "{} {}/{}",
                    key.0, key.1, key.2
                )))
            }
        };
        if object.resource_version.is_some() && object.resource_version != current_version {
            return Err(MetadataError::Conflict(format!(
                "{} {}/{} has been modified",
                key.0, key.1, key.2
            )));
        }
        let mut stored = object.clone();
        stored.resource_version = Some(inner.bump());
        inner.objects.insert(key, stored.clone());
        inner.updates += 1;
        Ok(stored)
    }
}
