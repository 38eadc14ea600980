//! Persistence interface used by the reconciliation core
//!
//! The core never touches the Kubernetes API directly. It reads a copy of an
//! object, changes the copy and submits it back through [`MetadataStore`].

mod api;
mod memory;

pub use api::KubeMetadataStore;
pub use memory::MemoryStore;

use crate::crd::{
    KubernetesServicesOptions, SystemImages, API_VERSION, PROVENANCE_LABEL, PROVENANCE_LABEL_VALUE,
};
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::fmt;

#[cfg(test)]
use mockall::automock;

/// The persisted metadata kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataKind {
    SystemImage,
    ServiceOption,
    Addon,
    WindowsSystemImage,
}

impl MetadataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKind::SystemImage => "RkeK8sSystemImage",
            MetadataKind::ServiceOption => "RkeK8sServiceOption",
            MetadataKind::Addon => "RkeAddon",
            MetadataKind::WindowsSystemImage => "RkeK8sWindowsSystemImage",
        }
    }
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific content of a metadata object
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataPayload {
    SystemImages(SystemImages),
    ServiceOptions(KubernetesServicesOptions),
    Template(String),
    WindowsSystemImages(SystemImages),
}

impl MetadataPayload {
    pub fn kind(&self) -> MetadataKind {
        match self {
            MetadataPayload::SystemImages(_) => MetadataKind::SystemImage,
            MetadataPayload::ServiceOptions(_) => MetadataKind::ServiceOption,
            MetadataPayload::Template(_) => MetadataKind::Addon,
            MetadataPayload::WindowsSystemImages(_) => MetadataKind::WindowsSystemImage,
        }
    }
}

/// A persisted metadata object as the core sees it.
///
/// Equality of `payload` is what decides whether an update is needed;
/// `resource_version` is carried through so a stale update is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataObject {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub payload: MetadataPayload,
    pub resource_version: Option<String>,
    /// Metadata as last read from the store. Fields not modeled above
    /// (annotations, finalizers, owner references) are written back unchanged.
    pub metadata: Option<ObjectMeta>,
}

impl MetadataObject {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, payload: MetadataPayload) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
            payload,
            resource_version: None,
            metadata: None,
        }
    }

    pub fn kind(&self) -> MetadataKind {
        self.payload.kind()
    }

    pub fn api_version(&self) -> &'static str {
        API_VERSION
    }

    /// Whether the provenance label already says what `vendor_sourced` wants
    pub fn provenance_matches(&self, vendor_sourced: bool) -> bool {
        match self.labels.get(PROVENANCE_LABEL) {
            Some(value) => vendor_sourced && value == PROVENANCE_LABEL_VALUE,
            None => !vendor_sourced,
        }
    }

    /// Set or clear the provenance label, leaving other labels alone
    pub fn set_provenance(&mut self, vendor_sourced: bool) {
        if vendor_sourced {
            self.labels
                .insert(PROVENANCE_LABEL.to_string(), PROVENANCE_LABEL_VALUE.to_string());
        } else {
            self.labels.remove(PROVENANCE_LABEL);
        }
    }
}

/// Keyed object store holding the metadata objects.
///
/// Errors: `get` reports a missing object as `NotFound`, `create` reports an
/// existing one as `AlreadyExists`, and `update` reports a lost race as
/// `Conflict`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, kind: MetadataKind, namespace: &str, name: &str) -> Result<MetadataObject>;

    async fn create(&self, object: &MetadataObject) -> Result<MetadataObject>;

    async fn update(&self, object: &MetadataObject) -> Result<MetadataObject>;
}
