//! Kubernetes API backed metadata store

use super::{MetadataKind, MetadataObject, MetadataPayload, MetadataStore};
use crate::crd::{RkeAddon, RkeK8sServiceOption, RkeK8sSystemImage, RkeK8sWindowsSystemImage};
use crate::error::{MetadataError, Result};
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// Conversion between a metadata resource and [`MetadataObject`]
trait MetadataResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    fn payload(&self) -> MetadataPayload;

    fn from_payload(name: &str, payload: &MetadataPayload) -> Result<Self>;

    fn to_object(&self) -> MetadataObject {
        MetadataObject {
            name: self.name_any(),
            namespace: self.namespace().unwrap_or_default(),
            labels: self.labels().clone(),
            payload: self.payload(),
            resource_version: self.resource_version(),
            metadata: Some(self.meta().clone()),
        }
    }

    /// Build the resource to submit, starting from the metadata last read so
    /// only name, namespace, labels and resource version are overwritten.
    fn from_object(object: &MetadataObject) -> Result<Self> {
        let mut resource = Self::from_payload(&object.name, &object.payload)?;
        let meta = resource.meta_mut();
        if let Some(read) = &object.metadata {
            *meta = read.clone();
        }
        meta.name = Some(object.name.clone());
        meta.namespace = Some(object.namespace.clone());
        meta.labels = if object.labels.is_empty() {
            None
        } else {
            Some(object.labels.clone())
        };
        meta.resource_version = object.resource_version.clone();
        Ok(resource)
    }
}

fn payload_mismatch(kind: &str, payload: &MetadataPayload) -> MetadataError {
    MetadataError::Configuration(format!(
        "{} cannot hold a {} payload",
        kind,
        payload.kind()
    ))
}

impl MetadataResource for RkeK8sSystemImage {
    fn payload(&self) -> MetadataPayload {
        MetadataPayload::SystemImages(self.system_images.clone())
    }

    fn from_payload(name: &str, payload: &MetadataPayload) -> Result<Self> {
        match payload {
            MetadataPayload::SystemImages(images) => Ok(RkeK8sSystemImage::new(name, images.clone())),
            other => Err(payload_mismatch("RkeK8sSystemImage", other)),
        }
    }
}

impl MetadataResource for RkeK8sWindowsSystemImage {
    fn payload(&self) -> MetadataPayload {
        MetadataPayload::WindowsSystemImages(self.windows_system_images.clone())
    }

    fn from_payload(name: &str, payload: &MetadataPayload) -> Result<Self> {
        match payload {
            MetadataPayload::WindowsSystemImages(images) => {
                Ok(RkeK8sWindowsSystemImage::new(name, images.clone()))
            }
            other => Err(payload_mismatch("RkeK8sWindowsSystemImage", other)),
        }
    }
}

impl MetadataResource for RkeK8sServiceOption {
    fn payload(&self) -> MetadataPayload {
        MetadataPayload::ServiceOptions(self.service_options.clone())
    }

    fn from_payload(name: &str, payload: &MetadataPayload) -> Result<Self> {
        match payload {
            MetadataPayload::ServiceOptions(options) => Ok(RkeK8sServiceOption::new(name, options.clone())),
            other => Err(payload_mismatch("RkeK8sServiceOption", other)),
        }
    }
}

impl MetadataResource for RkeAddon {
    fn payload(&self) -> MetadataPayload {
        MetadataPayload::Template(self.template.clone())
    }

    fn from_payload(name: &str, payload: &MetadataPayload) -> Result<Self> {
        match payload {
            MetadataPayload::Template(template) => Ok(RkeAddon::new(name, template.clone())),
            other => Err(payload_mismatch("RkeAddon", other)),
        }
    }
}

/// Metadata store writing the custom resources through the API server
#[derive(Clone)]
pub struct KubeMetadataStore {
    client: Client,
}

impl KubeMetadataStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_as<K: MetadataResource>(&self, namespace: &str, name: &str) -> Result<MetadataObject> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(resource) => Ok(resource.to_object()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Err(MetadataError::NotFound(format!(
                "{} {}/{}",
                K::kind(&()),
                namespace,
                name
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_as<K: MetadataResource>(&self, object: &MetadataObject) -> Result<MetadataObject> {
        let api: Api<K> = Api::namespaced(self.client.clone(), &object.namespace);
        let resource = K::from_object(object)?;
        debug!("Creating {} {}/{}", K::kind(&()), object.namespace, object.name);
        match api.create(&PostParams::default(), &resource).await {
            Ok(created) => Ok(created.to_object()),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Err(MetadataError::AlreadyExists(
                format!("{} {}/{}", K::kind(&()), object.namespace, object.name),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_as<K: MetadataResource>(&self, object: &MetadataObject) -> Result<MetadataObject> {
        let api: Api<K> = Api::namespaced(self.client.clone(), &object.namespace);
        let resource = K::from_object(object)?;
        debug!("Replacing {} {}/{}", K::kind(&()), object.namespace, object.name);
        match api
            .replace(&object.name, &PostParams::default(), &resource)
            .await
        {
            Ok(updated) => Ok(updated.to_object()),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Err(MetadataError::Conflict(format!(
                "{} {}/{}: {}",
                K::kind(&()),
                object.namespace,
                object.name,
                ae.message
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl MetadataStore for KubeMetadataStore {
    async fn get(&self, kind: MetadataKind, namespace: &str, name: &str) -> Result<MetadataObject> {
        match kind {
            MetadataKind::SystemImage => self.get_as::<RkeK8sSystemImage>(namespace, name).await,
            MetadataKind::ServiceOption => self.get_as::<RkeK8sServiceOption>(namespace, name).await,
            MetadataKind::Addon => self.get_as::<RkeAddon>(namespace, name).await,
            MetadataKind::WindowsSystemImage => {
                self.get_as::<RkeK8sWindowsSystemImage>(namespace, name).await
            }
        }
    }

    async fn create(&self, object: &MetadataObject) -> Result<MetadataObject> {
        match object.kind() {
            MetadataKind::SystemImage => self.create_as::<RkeK8sSystemImage>(object).await,
            MetadataKind::ServiceOption => self.create_as::<RkeK8sServiceOption>(object).await,
            MetadataKind::Addon => self.create_as::<RkeAddon>(object).await,
            MetadataKind::WindowsSystemImage => {
                self.create_as::<RkeK8sWindowsSystemImage>(object).await
            }
        }
    }

    async fn update(&self, object: &MetadataObject) -> Result<MetadataObject> {
        match object.kind() {
            MetadataKind::SystemImage => self.update_as::<RkeK8sSystemImage>(object).await,
            MetadataKind::ServiceOption => self.update_as::<RkeK8sServiceOption>(object).await,
            MetadataKind::Addon => self.update_as::<RkeAddon>(object).await,
            MetadataKind::WindowsSystemImage => {
                self.update_as::<RkeK8sWindowsSystemImage>(object).await
            }
        }
    }
}
