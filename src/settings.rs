//! Publishing of the version aggregate to named settings
//!
//! Settings are written one at a time in a fixed order; the first failure
//! stops the rest.

use crate::aggregate::VersionAggregate;
use crate::crd::API_GROUP;
use crate::error::{MetadataError, Result};
use async_trait::async_trait;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, Patch, PatchParams};
use kube::Client;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

pub const KUBERNETES_VERSION_TO_SYSTEM_IMAGES: &str = "kubernetes-version-to-system-images";
pub const KUBERNETES_VERSIONS_CURRENT: &str = "kubernetes-versions-current";
pub const KUBERNETES_VERSION_TO_SERVICE_OPTIONS: &str = "kubernetes-version-to-service-options";
pub const KUBERNETES_VERSION: &str = "kubernetes-version";
pub const UI_KUBERNETES_SUPPORTED_VERSIONS: &str = "ui-kubernetes-supported-versions";
pub const UI_KUBERNETES_DEFAULT_VERSION: &str = "ui-kubernetes-default-version";

const FIELD_MANAGER: &str = "kdm-operator";

/// Destination of named string settings
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SettingsSink: Send + Sync {
    async fn set(&self, name: &str, value: &str) -> Result<()>;
}

/// `{"<version>": null, ...}` for every current version
pub fn system_images_value(aggregate: &VersionAggregate) -> Result<String> {
    let value: BTreeMap<&str, serde_json::Value> = aggregate
        .current
        .values()
        .map(|v| (v.as_str(), serde_json::Value::Null))
        .collect();
    Ok(serde_json::to_string(&value)?)
}

pub fn service_options_value(aggregate: &VersionAggregate) -> Result<String> {
    Ok(serde_json::to_string(&aggregate.service_options)?)
}

pub fn current_versions_value(aggregate: &VersionAggregate) -> String {
    aggregate.current_versions.join(",")
}

/// Writes a [`VersionAggregate`] through a [`SettingsSink`]
pub struct SettingsPublisher<'a> {
    sink: &'a dyn SettingsSink,
}

impl<'a> SettingsPublisher<'a> {
    pub fn new(sink: &'a dyn SettingsSink) -> Self {
        Self { sink }
    }

    pub async fn publish(&self, aggregate: &VersionAggregate) -> Result<()> {
        // serialize everything up front so a marshal failure writes nothing
        let system_images = system_images_value(aggregate)?;
        let service_options = service_options_value(aggregate)?;

        self.write(KUBERNETES_VERSION_TO_SYSTEM_IMAGES, &system_images).await?;
        self.write(KUBERNETES_VERSIONS_CURRENT, &current_versions_value(aggregate))
            .await?;
        self.write(KUBERNETES_VERSION_TO_SERVICE_OPTIONS, &service_options)
            .await?;
        self.write(KUBERNETES_VERSION, &aggregate.default_version).await?;

        if let (Some(supported), Some(default_range)) =
            (&aggregate.supported_range, &aggregate.default_range)
        {
            self.write(UI_KUBERNETES_SUPPORTED_VERSIONS, supported).await?;
            self.write(UI_KUBERNETES_DEFAULT_VERSION, default_range).await?;
        } else {
            debug!("No current Kubernetes versions, leaving UI version ranges untouched");
        }
        Ok(())
    }

    async fn write(&self, name: &str, value: &str) -> Result<()> {
        self.sink.set(name, value).await.map_err(|e| match e {
            MetadataError::SettingsWrite(_) => e,
            other => MetadataError::SettingsWrite(format!("{}: {}", name, other)),
        })
    }
}

/// Writes settings as cluster-scoped `management.cattle.io/v3` Setting objects
#[derive(Clone)]
pub struct KubeSettingsSink {
    client: Client,
    resource: ApiResource,
}

impl KubeSettingsSink {
    pub fn new(client: Client) -> Self {
        let gvk = GroupVersionKind::gvk(API_GROUP, "v3", "Setting");
        Self {
            client,
            resource: ApiResource::from_gvk(&gvk),
        }
    }
}

#[async_trait]
impl SettingsSink for KubeSettingsSink {
    async fn set(&self, name: &str, value: &str) -> Result<()> {
        let settings: Api<DynamicObject> = Api::all_with(self.client.clone(), &self.resource);
        let patch = serde_json::json!({
            "apiVersion": self.resource.api_version,
            "kind": self.resource.kind,
            "metadata": { "name": name },
            "value": value,
        });
        settings
            .patch(
                name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(&patch),
            )
            .await
            .map_err(|e| MetadataError::SettingsWrite(format!("{}: {}", name, e)))?;
        debug!("Set setting {}", name);
        Ok(())
    }
}

/// Logs settings instead of writing them, for dry runs
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSettingsSink;

#[async_trait]
impl SettingsSink for LoggingSettingsSink {
    async fn set(&self, name: &str, value: &str) -> Result<()> {
        info!(setting = %name, value = %value, "Would set setting");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::KubernetesServicesOptions;
    use mockall::predicate::eq;
    use mockall::Sequence;

    // every role key is written, empty roles as null
    const SERVICE_OPTIONS_VALUE: &str = concat!(
        r#"{"v1.18.9":{"etcd":null,"kubeapi":null,"kubelet":{"max-pods":"250"},"kubeproxy":null,"kubeController":null,"scheduler":null},"#,
        r#""v1.19.3":{"etcd":null,"kubeapi":null,"kubelet":null,"kubeproxy":null,"kubeController":null,"scheduler":null}}"#,
    );

    fn aggregate() -> VersionAggregate {
        let mut current = BTreeMap::new();
        current.insert("v1.18".to_string(), "v1.18.9".to_string());
        current.insert("v1.19".to_string(), "v1.19.3".to_string());
        let mut options = KubernetesServicesOptions::default();
        options
            .kubelet
            .insert("max-pods".to_string(), "250".to_string());
        let mut service_options = BTreeMap::new();
        service_options.insert("v1.18.9".to_string(), options);
        service_options.insert("v1.19.3".to_string(), KubernetesServicesOptions::default());
        VersionAggregate {
            current,
            current_versions: vec!["v1.18.9".to_string(), "v1.19.3".to_string()],
            service_options,
            default_version: "v1.18.9".to_string(),
            supported_range: Some(">=v1.18.x <=v1.18.x".to_string()),
            default_range: Some("<=v1.18.x".to_string()),
        }
    }

    #[test]
    fn test_setting_values() {
        let aggregate = aggregate();
        assert_eq!(
            system_images_value(&aggregate).unwrap(),
            r#"{"v1.18.9":null,"v1.19.3":null}"#
        );
        assert_eq!(current_versions_value(&aggregate), "v1.18.9,v1.19.3");
        assert_eq!(service_options_value(&aggregate).unwrap(), SERVICE_OPTIONS_VALUE);
    }

    #[tokio::test]
    async fn test_publishes_all_settings_in_order() {
        let mut sink = MockSettingsSink::new();
        let mut seq = Sequence::new();
        for (name, value) in [
            (KUBERNETES_VERSION_TO_SYSTEM_IMAGES, r#"{"v1.18.9":null,"v1.19.3":null}"#),
            (KUBERNETES_VERSIONS_CURRENT, "v1.18.9,v1.19.3"),
            (KUBERNETES_VERSION_TO_SERVICE_OPTIONS, SERVICE_OPTIONS_VALUE),
            (KUBERNETES_VERSION, "v1.18.9"),
            (UI_KUBERNETES_SUPPORTED_VERSIONS, ">=v1.18.x <=v1.18.x"),
            (UI_KUBERNETES_DEFAULT_VERSION, "<=v1.18.x"),
        ] {
            sink.expect_set()
                .with(eq(name), eq(value))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
        }

        SettingsPublisher::new(&sink).publish(&aggregate()).await.unwrap();
    }

    #[tokio::test]
    async fn test_ranges_skipped_without_current_versions() {
        let mut sink = MockSettingsSink::new();
        sink.expect_set()
            .with(eq(KUBERNETES_VERSION), eq("v1.18.9"))
            .times(1)
            .returning(|_, _| Ok(()));
        // the three map/list settings, and nothing else
        sink.expect_set().times(3).returning(|_, _| Ok(()));

        let empty = VersionAggregate {
            default_version: "v1.18.9".to_string(),
            ..Default::default()
        };
        SettingsPublisher::new(&sink).publish(&empty).await.unwrap();
    }

    #[tokio::test]
    async fn test_first_failure_stops_publishing() {
        let mut sink = MockSettingsSink::new();
        sink.expect_set()
            .with(eq(KUBERNETES_VERSION_TO_SYSTEM_IMAGES), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok(()));
        sink.expect_set()
            .with(eq(KUBERNETES_VERSIONS_CURRENT), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Err(MetadataError::KubeApi("forbidden".to_string())));

        let err = SettingsPublisher::new(&sink)
            .publish(&aggregate())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            MetadataError::SettingsWrite(
                "kubernetes-versions-current: Kubernetes API error: forbidden".to_string()
            )
        );
    }
}
