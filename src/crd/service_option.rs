//! RkeK8sServiceOption
//!
//! Default flags for the Kubernetes services of one version, partitioned by
//! the service they apply to. Windows variants share this kind under a
//! `w`-prefixed name.

use super::{named, API_VERSION};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RkeK8sServiceOption {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub service_options: KubernetesServicesOptions,
}

management_resource!(RkeK8sServiceOption, "RkeK8sServiceOption", "rkek8sserviceoptions");

impl RkeK8sServiceOption {
    pub fn new(name: &str, service_options: KubernetesServicesOptions) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: "RkeK8sServiceOption".to_string(),
            metadata: named(name),
            service_options,
        }
    }
}

/// Option name to value, per Kubernetes service.
///
/// Every role key is always written; a role without options is written as
/// `null`, and `null` reads back as no options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesServicesOptions {
    #[serde(default, serialize_with = "null_if_empty", deserialize_with = "empty_if_null")]
    pub etcd: BTreeMap<String, String>,

    #[serde(default, serialize_with = "null_if_empty", deserialize_with = "empty_if_null")]
    pub kubeapi: BTreeMap<String, String>,

    #[serde(default, serialize_with = "null_if_empty", deserialize_with = "empty_if_null")]
    pub kubelet: BTreeMap<String, String>,

    #[serde(default, serialize_with = "null_if_empty", deserialize_with = "empty_if_null")]
    pub kubeproxy: BTreeMap<String, String>,

    #[serde(default, serialize_with = "null_if_empty", deserialize_with = "empty_if_null")]
    pub kube_controller: BTreeMap<String, String>,

    #[serde(default, serialize_with = "null_if_empty", deserialize_with = "empty_if_null")]
    pub scheduler: BTreeMap<String, String>,
}

fn null_if_empty<S: Serializer>(options: &BTreeMap<String, String>, serializer: S) -> Result<S::Ok, S::Error> {
    if options.is_empty() {
        serializer.serialize_none()
    } else {
        options.serialize(serializer)
    }
}

fn empty_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error> {
    Ok(Option::<BTreeMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}
