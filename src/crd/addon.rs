//! RkeAddon

use super::{named, API_VERSION};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

/// A rendered addon manifest for one addon and Kubernetes version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RkeAddon {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub template: String,
}

management_resource!(RkeAddon, "RkeAddon", "rkeaddons");

impl RkeAddon {
    pub fn new(name: &str, template: String) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: "RkeAddon".to_string(),
            metadata: named(name),
            template,
        }
    }
}
