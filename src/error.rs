//! Error types for the metadata operator

use std::fmt;

/// Result type alias for metadata operations
pub type Result<T> = std::result::Result<T, MetadataError>;

/// Errors that can occur while reconciling driver metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// Object does not exist in the store
    NotFound(String),
    /// Object already exists in the store
    AlreadyExists(String),
    /// Update lost a race against another writer
    Conflict(String),
    /// Any other Kubernetes API error
    KubeApi(String),
    /// Malformed version string in the catalog or a compatibility record
    VersionParse(String),
    /// Payload could not be marshaled
    Serialization(String),
    /// Writing a named setting failed
    SettingsWrite(String),
    /// Configuration error
    Configuration(String),
    /// Catalog snapshot could not be loaded
    Catalog(String),
}

impl MetadataError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, MetadataError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, MetadataError::AlreadyExists(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, MetadataError::Conflict(_))
    }
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataError::NotFound(msg) => write!(f, "Resource not found: {}", msg),
            MetadataError::AlreadyExists(msg) => write!(f, "Resource already exists: {}", msg),
            MetadataError::Conflict(msg) => write!(f, "Update conflict: {}", msg),
            MetadataError::KubeApi(msg) => write!(f, "Kubernetes API error: {}", msg),
            MetadataError::VersionParse(msg) => write!(f, "Version parse error: {}", msg),
            MetadataError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            MetadataError::SettingsWrite(msg) => write!(f, "Settings write error: {}", msg),
            MetadataError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            MetadataError::Catalog(msg) => write!(f, "Catalog error: {}", msg),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<kube::Error> for MetadataError {
    fn from(err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(ae) if ae.code == 404 => MetadataError::NotFound(ae.message.clone()),
            _ => MetadataError::KubeApi(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for MetadataError {
    fn from(err: serde_json::Error) -> Self {
        MetadataError::Serialization(err.to_string())
    }
}
