//! Create-or-update decision for a single metadata object
//!
//! Compares a catalog payload against the persisted object of the same key
//! and submits at most one write:
//! - missing object: create it with the payload and the provenance label
//! - payload unchanged: fix the provenance label if it is wrong, else nothing
//! - payload changed: update the payload only; the label converges on a
//!   later pass once the payload matches

use crate::error::Result;
use crate::store::{MetadataObject, MetadataPayload, MetadataStore};
use tracing::{debug, info, warn};

/// What a single upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    /// Another writer created the object first
    AlreadyExisted,
    PayloadUpdated,
    LabelsUpdated,
    Unchanged,
}

/// Applies catalog payloads to a metadata store
pub struct CatalogDiffer<'a> {
    store: &'a dyn MetadataStore,
    namespace: &'a str,
}

impl<'a> CatalogDiffer<'a> {
    pub fn new(store: &'a dyn MetadataStore, namespace: &'a str) -> Self {
        Self { store, namespace }
    }

    /// Bring the object `name` in line with `payload`.
    ///
    /// `vendor_sourced` is whether the object's version ships in the vendor
    /// default catalog; it decides the provenance label.
    pub async fn upsert(
        &self,
        name: &str,
        payload: MetadataPayload,
        vendor_sourced: bool,
    ) -> Result<UpsertOutcome> {
        let kind = payload.kind();
        let existing = match self.store.get(kind, self.namespace, name).await {
            Ok(existing) => existing,
            Err(e) if e.is_not_found() => {
                let mut object = MetadataObject::new(name, self.namespace, payload);
                object.set_provenance(vendor_sourced);
                return match self.store.create(&object).await {
                    Ok(_) => {
                        info!("Created {} {}/{}", kind, self.namespace, name);
                        Ok(UpsertOutcome::Created)
                    }
                    Err(e) if e.is_already_exists() => {
                        warn!("{} {}/{} was created concurrently", kind, self.namespace, name);
                        Ok(UpsertOutcome::AlreadyExisted)
                    }
                    Err(e) => Err(e),
                };
            }
            Err(e) => return Err(e),
        };

        if existing.payload == payload {
            if existing.provenance_matches(vendor_sourced) {
                debug!("{} {}/{} is up to date", kind, self.namespace, name);
                return Ok(UpsertOutcome::Unchanged);
            }
            let mut updated = existing;
            updated.set_provenance(vendor_sourced);
            self.store.update(&updated).await?;
            info!(
                "Updated provenance label of {} {}/{} (vendor sourced: {})",
                kind, self.namespace, name, vendor_sourced
            );
            return Ok(UpsertOutcome::LabelsUpdated);
        }

        let mut updated = existing;
        updated.payload = payload;
        self.store.update(&updated).await?;
        info!("Updated {} {}/{}", kind, self.namespace, name);
        Ok(UpsertOutcome::PayloadUpdated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{PROVENANCE_LABEL, PROVENANCE_LABEL_VALUE};
    use crate::error::MetadataError;
    use crate::store::{MemoryStore, MetadataKind, MockMetadataStore};
    use std::collections::BTreeMap;

    const NS: &str = "cattle-global-data";

    fn images(etcd: &str) -> MetadataPayload {
        let mut images = BTreeMap::new();
        images.insert("etcd".to_string(), etcd.to_string());
        MetadataPayload::SystemImages(images)
    }

    #[tokio::test]
    async fn test_creates_missing_object_with_label() {
        let store = MemoryStore::new();
        let differ = CatalogDiffer::new(&store, NS);

        let outcome = differ.upsert("v1.18.9", images("etcd:v3.4"), true).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);

        let stored = store.object(MetadataKind::SystemImage, NS, "v1.18.9").await.unwrap();
        assert_eq!(stored.payload, images("etcd:v3.4"));
        assert_eq!(
            stored.labels.get(PROVENANCE_LABEL).map(String::as_str),
            Some(PROVENANCE_LABEL_VALUE)
        );
    }

    #[tokio::test]
    async fn test_creates_custom_object_without_label() {
        let store = MemoryStore::new();
        let differ = CatalogDiffer::new(&store, NS);

        differ.upsert("v1.18.9", images("etcd:v3.4"), false).await.unwrap();
        let stored = store.object(MetadataKind::SystemImage, NS, "v1.18.9").await.unwrap();
        assert!(stored.labels.is_empty());
    }

    #[tokio::test]
    async fn test_unchanged_object_is_left_alone() {
        let store = MemoryStore::new();
        let differ = CatalogDiffer::new(&store, NS);
        differ.upsert("v1.18.9", images("etcd:v3.4"), true).await.unwrap();

        let outcome = differ.upsert("v1.18.9", images("etcd:v3.4"), true).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Unchanged);
        assert_eq!(store.update_count().await, 0);
    }

    #[tokio::test]
    async fn test_label_only_update_when_payload_matches() {
        let store = MemoryStore::new();
        let differ = CatalogDiffer::new(&store, NS);
        differ.upsert("v1.18.9", images("etcd:v3.4"), false).await.unwrap();

        let outcome = differ.upsert("v1.18.9", images("etcd:v3.4"), true).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::LabelsUpdated);
        let stored = store.object(MetadataKind::SystemImage, NS, "v1.18.9").await.unwrap();
        assert!(stored.provenance_matches(true));

        let outcome = differ.upsert("v1.18.9", images("etcd:v3.4"), false).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::LabelsUpdated);
        let stored = store.object(MetadataKind::SystemImage, NS, "v1.18.9").await.unwrap();
        assert!(!stored.labels.contains_key(PROVENANCE_LABEL));
    }

    #[tokio::test]
    async fn test_payload_change_defers_label() {
        let store = MemoryStore::new();
        let differ = CatalogDiffer::new(&store, NS);
        differ.upsert("v1.18.9", images("etcd:v3.4"), false).await.unwrap();

        let outcome = differ.upsert("v1.18.9", images("etcd:v3.5"), true).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::PayloadUpdated);
        let stored = store.object(MetadataKind::SystemImage, NS, "v1.18.9").await.unwrap();
        assert_eq!(stored.payload, images("etcd:v3.5"));
        assert!(stored.labels.is_empty());

        // next pass converges the label
        let outcome = differ.upsert("v1.18.9", images("etcd:v3.5"), true).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::LabelsUpdated);
    }

    #[tokio::test]
    async fn test_update_keeps_unrelated_labels() {
        let store = MemoryStore::new();
        let mut seeded = MetadataObject::new("v1.18.9", NS, images("etcd:v3.4"));
        seeded.labels.insert("owner".to_string(), "ops".to_string());
        store.insert(seeded).await;

        let differ = CatalogDiffer::new(&store, NS);
        differ.upsert("v1.18.9", images("etcd:v3.4"), true).await.unwrap();
        let stored = store.object(MetadataKind::SystemImage, NS, "v1.18.9").await.unwrap();
        assert_eq!(stored.labels.get("owner").map(String::as_str), Some("ops"));
        assert!(stored.provenance_matches(true));
    }

    #[tokio::test]
    async fn test_lost_create_race_is_benign() {
        let mut store = MockMetadataStore::new();
        store
            .expect_get()
            .returning(|_, _, name| Err(MetadataError::NotFound(name.to_string())));
        store
            .expect_create()
            .times(1)
            .returning(|obj| Err(MetadataError::AlreadyExists(obj.name.clone())));
        store.expect_update().never();

        let differ = CatalogDiffer::new(&store, NS);
        let outcome = differ.upsert("v1.18.9", images("etcd:v3.4"), true).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::AlreadyExisted);
    }

    #[tokio::test]
    async fn test_get_error_is_surfaced() {
        let mut store = MockMetadataStore::new();
        store
            .expect_get()
            .returning(|_, _, _| Err(MetadataError::KubeApi("connection refused".to_string())));
        store.expect_create().never();

        let differ = CatalogDiffer::new(&store, NS);
        let err = differ.upsert("v1.18.9", images("etcd:v3.4"), true).await.unwrap_err();
        assert!(matches!(err, MetadataError::KubeApi(_)));
    }

    #[tokio::test]
    async fn test_update_conflict_is_surfaced() {
        let mut store = MockMetadataStore::new();
        store.expect_get().returning(|_, ns, name| {
            Ok(MetadataObject::new(name, ns, images("etcd:v3.4")))
        });
        store
            .expect_update()
            .times(1)
            .returning(|obj| Err(MetadataError::Conflict(obj.name.clone())));

        let differ = CatalogDiffer::new(&store, NS);
        let err = differ.upsert("v1.18.9", images("etcd:v3.5"), false).await.unwrap_err();
        assert!(err.is_conflict());
    }
}
