//! Catalog snapshot of Kubernetes distribution metadata
//!
//! A snapshot is read-only for the duration of a reconciliation pass and is
//! replaced wholesale on the next refresh. Field names follow the published
//! driver metadata document so a snapshot deserializes straight from it.

use crate::crd::{KubernetesServicesOptions, SystemImages};
use crate::error::{MetadataError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Compatibility bounds of a Kubernetes version (or major version) against
/// the management-plane version. Empty means unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    #[serde(default)]
    pub min_rancher_version: String,

    #[serde(default)]
    pub max_rancher_version: String,

    #[serde(default)]
    pub deprecate_rancher_version: String,
}

/// A full catalog snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataCatalog {
    /// System images by Kubernetes version
    #[serde(rename = "K8sVersionRKESystemImages", default)]
    pub system_images: HashMap<String, SystemImages>,

    /// Compatibility bounds by Kubernetes version or major version
    #[serde(rename = "K8sVersionInfo", default)]
    pub version_info: HashMap<String, VersionInfo>,

    /// Service options by Kubernetes version or major version
    #[serde(rename = "K8sVersionServiceOptions", default)]
    pub service_options: HashMap<String, KubernetesServicesOptions>,

    /// Addon templates by addon name, then Kubernetes version
    #[serde(rename = "K8sVersionedTemplates", default)]
    pub addon_templates: HashMap<String, HashMap<String, String>>,

    #[serde(rename = "K8sVersionWindowsSystemImages", default)]
    pub windows_system_images: HashMap<String, SystemImages>,

    #[serde(rename = "K8sVersionWindowsServiceOptions", default)]
    pub windows_service_options: HashMap<String, KubernetesServicesOptions>,

    /// Default Kubernetes version by management-plane version, with a `default` fallback
    #[serde(rename = "RancherDefaultK8sVersions", default)]
    pub default_k8s_versions: HashMap<String, String>,
}

impl MetadataCatalog {
    /// Parse a snapshot from its JSON document
    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(|e| MetadataError::Catalog(e.to_string()))
    }

    /// Load a snapshot from a JSON file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| MetadataError::Catalog(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&data)
    }

    pub fn has_system_images(&self, k8s_version: &str) -> bool {
        self.system_images.contains_key(k8s_version)
    }

    pub fn has_service_options(&self, k8s_version: &str) -> bool {
        self.service_options.contains_key(k8s_version)
    }

    pub fn has_addon_template(&self, addon: &str, k8s_version: &str) -> bool {
        self.addon_templates
            .get(addon)
            .is_some_and(|templates| templates.contains_key(k8s_version))
    }

    pub fn has_windows_system_images(&self, k8s_version: &str) -> bool {
        self.windows_system_images.contains_key(k8s_version)
    }

    pub fn has_windows_service_options(&self, k8s_version: &str) -> bool {
        self.windows_service_options.contains_key(k8s_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "K8sVersionRKESystemImages": {
            "v1.18.9-rancher1-1": {"etcd": "rancher/coreos-etcd:v3.4.3-rancher1"}
        },
        "K8sVersionInfo": {
            "v1.18": {"maxRancherVersion": "2.5"},
            "v1.15.12-rancher2-2": {"deprecateRancherVersion": "2.4"}
        },
        "K8sVersionServiceOptions": {
            "v1.18": {"kubelet": {"max-pods": "250"}}
        },
        "K8sVersionedTemplates": {
            "coreDNS": {"v1.18.9-rancher1-1": "apiVersion: v1"}
        },
        "RancherDefaultK8sVersions": {"2.5": "v1.18.x", "default": "v1.18.x"}
    }"#;

    #[test]
    fn test_from_json() {
        let catalog = MetadataCatalog::from_json(SNAPSHOT).unwrap();
        assert!(catalog.has_system_images("v1.18.9-rancher1-1"));
        assert!(!catalog.has_system_images("v1.19.3-rancher1-1"));
        assert_eq!(
            catalog.version_info["v1.18"].max_rancher_version,
            "2.5".to_string()
        );
        assert!(catalog.version_info["v1.18"].min_rancher_version.is_empty());
        assert!(catalog.has_service_options("v1.18"));
        assert!(catalog.has_addon_template("coreDNS", "v1.18.9-rancher1-1"));
        assert!(!catalog.has_addon_template("coredns", "v1.18.9-rancher1-1"));
        assert!(catalog.windows_system_images.is_empty());
        assert_eq!(catalog.default_k8s_versions["default"], "v1.18.x");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = MetadataCatalog::from_json("not json").unwrap_err();
        assert!(matches!(err, MetadataError::Catalog(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = MetadataCatalog::load("/nonexistent/kdm/data.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/kdm/data.json"));
    }
}
