//! RkeK8sSystemImage and RkeK8sWindowsSystemImage
//!
//! Both map a logical component name (`etcd`, `kubernetes`, `coredns`, ...)
//! to an image reference for one Kubernetes version.

use super::{named, API_VERSION};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Component name to image reference
pub type SystemImages = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RkeK8sSystemImage {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Images keyed by component
    #[serde(default)]
    pub system_images: SystemImages,
}

management_resource!(RkeK8sSystemImage, "RkeK8sSystemImage", "rkek8ssystemimages");

impl RkeK8sSystemImage {
    pub fn new(name: &str, system_images: SystemImages) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: "RkeK8sSystemImage".to_string(),
            metadata: named(name),
            system_images,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RkeK8sWindowsSystemImage {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Windows images keyed by component
    #[serde(default)]
    pub windows_system_images: SystemImages,
}

management_resource!(
    RkeK8sWindowsSystemImage,
    "RkeK8sWindowsSystemImage",
    "rkek8swindowssystemimages"
);

impl RkeK8sWindowsSystemImage {
    pub fn new(name: &str, windows_system_images: SystemImages) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: "RkeK8sWindowsSystemImage".to_string(),
            metadata: named(name),
            windows_system_images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::ResourceExt;

    #[test]
    fn test_reads_top_level_payload() {
        let json = r#"{
            "apiVersion": "management.cattle.io/v3",
            "kind": "RkeK8sSystemImage",
            "metadata": {"name": "v1.18.9-rancher1-1", "namespace": "cattle-global-data"},
            "systemImages": {"etcd": "rancher/coreos-etcd:v3.4.3-rancher1"}
        }"#;
        let image: RkeK8sSystemImage = serde_json::from_str(json).unwrap();
        assert_eq!(image.name_any(), "v1.18.9-rancher1-1");
        assert_eq!(
            image.system_images.get("etcd").map(String::as_str),
            Some("rancher/coreos-etcd:v3.4.3-rancher1")
        );

        let json = r#"{"metadata": {"name": "wv1.18.9"}, "windowsSystemImages": {"nginxProxy": "rancher/nginx-proxy:v1"}}"#;
        let image: RkeK8sWindowsSystemImage = serde_json::from_str(json).unwrap();
        assert_eq!(image.windows_system_images.len(), 1);
    }

    #[test]
    fn test_writes_top_level_payload() {
        let mut images = SystemImages::new();
        images.insert("etcd".to_string(), "rancher/coreos-etcd:v3.4.3".to_string());
        let value = serde_json::to_value(RkeK8sSystemImage::new("v1.18.9", images)).unwrap();
        assert_eq!(value["apiVersion"], "management.cattle.io/v3");
        assert_eq!(value["kind"], "RkeK8sSystemImage");
        assert_eq!(value["systemImages"]["etcd"], "rancher/coreos-etcd:v3.4.3");
        assert!(value.get("spec").is_none());
    }

    #[test]
    fn test_missing_payload_defaults() {
        let image: RkeK8sSystemImage = serde_json::from_str(r#"{"metadata": {"name": "v1.18.9"}}"#).unwrap();
        assert!(image.system_images.is_empty());
    }
}
