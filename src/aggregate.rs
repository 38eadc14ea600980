//! Current-version aggregate derived from the system image catalog
//!
//! Picks one representative version per major version line and derives the
//! default version and the UI range strings from it. The representative is
//! the greatest version by plain string comparison, not by version
//! semantics: `v1.18.9` beats `v1.18.10`. Published settings rely on that
//! ordering.

use crate::catalog::MetadataCatalog;
use crate::crd::KubernetesServicesOptions;
use crate::error::{MetadataError, Result};
use crate::version;
use std::collections::{BTreeMap, HashMap};

/// Key of the fallback row in the default-version table
pub const DEFAULT_VERSION_KEY: &str = "default";

/// A full version eligible to represent its major version line
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CurrentCandidate {
    pub major: String,
    pub version: String,
}

impl CurrentCandidate {
    pub fn new(major: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            major: major.into(),
            version: version.into(),
        }
    }
}

/// Derived, per-pass aggregate published through the settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionAggregate {
    /// Representative full version by major version
    pub current: BTreeMap<String, String>,
    /// Representative full versions, sorted
    pub current_versions: Vec<String>,
    /// Service options of each representative, looked up by its major version
    pub service_options: BTreeMap<String, KubernetesServicesOptions>,
    pub default_version: String,
    /// `>=<min major>.x <=<default major>.x`, absent when nothing is current
    pub supported_range: Option<String>,
    /// `<=<default major>.x`, absent when nothing is current
    pub default_range: Option<String>,
}

/// Keep the greatest candidate string per major version
pub fn select_current(candidates: &[CurrentCandidate]) -> BTreeMap<String, String> {
    let mut current: BTreeMap<String, String> = BTreeMap::new();
    for candidate in candidates {
        match current.get(&candidate.major) {
            Some(best) if best.as_str() >= candidate.version.as_str() => {}
            _ => {
                current.insert(candidate.major.clone(), candidate.version.clone());
            }
        }
    }
    current
}

/// Default Kubernetes version for the running management-plane version,
/// falling back to the `default` row.
pub fn resolve_default_version(
    table: &HashMap<String, String>,
    running_version: &str,
) -> Result<String> {
    table
        .get(running_version)
        .filter(|v| !v.is_empty())
        .or_else(|| table.get(DEFAULT_VERSION_KEY).filter(|v| !v.is_empty()))
        .cloned()
        .ok_or_else(|| {
            MetadataError::Configuration(format!(
                "no default Kubernetes version for {:?} and no {:?} entry",
                running_version, DEFAULT_VERSION_KEY
            ))
        })
}

/// Computes the [`VersionAggregate`] of one catalog snapshot
pub struct VersionAggregator<'a> {
    service_options: &'a HashMap<String, KubernetesServicesOptions>,
    default_versions: &'a HashMap<String, String>,
    running_version: &'a str,
}

impl<'a> VersionAggregator<'a> {
    pub fn new(catalog: &'a MetadataCatalog, running_version: &'a str) -> Self {
        Self {
            service_options: &catalog.service_options,
            default_versions: &catalog.default_k8s_versions,
            running_version,
        }
    }

    pub fn aggregate(&self, candidates: &[CurrentCandidate]) -> Result<VersionAggregate> {
        let current = select_current(candidates);

        let mut current_versions: Vec<String> = current.values().cloned().collect();
        current_versions.sort();

        let service_options = current
            .iter()
            .map(|(major, full)| {
                let options = self.service_options.get(major).cloned().unwrap_or_default();
                (full.clone(), options)
            })
            .collect();

        let default_version = resolve_default_version(self.default_versions, self.running_version)?;

        // BTreeMap keys are already in ascending string order
        let (supported_range, default_range) = match current.keys().next() {
            Some(min_major) => {
                let max_major = version::major_version_of(&default_version)?;
                (
                    Some(format!(">={}.x <={}.x", min_major, max_major)),
                    Some(format!("<={}.x", max_major)),
                )
            }
            None => (None, None),
        };

        Ok(VersionAggregate {
            current,
            current_versions,
            service_options,
            default_version,
            supported_range,
            default_range,
        })
    }
}
