//! Per-kind reconcilers
//!
//! Each reconciler walks one map of the catalog snapshot and hands every
//! entry to the [`CatalogDiffer`]. Entries are independent, so map order has
//! no effect on the end state. The first failing entry aborts the kind.

mod addon;
mod service_option;
mod system_image;
mod windows;

pub use addon::reconcile_addons;
pub use service_option::reconcile_service_options;
pub use system_image::{reconcile_system_images, SystemImageOutcome};
pub use windows::{reconcile_windows_service_options, reconcile_windows_system_images};

use crate::catalog::MetadataCatalog;
use crate::compat::CompatibilityFilter;
use crate::differ::{CatalogDiffer, UpsertOutcome};
use std::fmt;

/// Everything a reconciler reads during one pass
pub struct PassContext<'a> {
    pub differ: CatalogDiffer<'a>,
    /// Snapshot being applied
    pub catalog: &'a MetadataCatalog,
    /// Vendor default catalog, used for provenance
    pub vendor: &'a MetadataCatalog,
    pub filter: &'a CompatibilityFilter,
}

/// Per-kind tally of upsert outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub labels_updated: usize,
    pub unchanged: usize,
    /// Entries gated out by compatibility
    pub skipped: usize,
}

impl ReconcileSummary {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::PayloadUpdated => self.updated += 1,
            UpsertOutcome::LabelsUpdated => self.labels_updated += 1,
            UpsertOutcome::Unchanged | UpsertOutcome::AlreadyExisted => self.unchanged += 1,
        }
    }

    /// Number of create and update calls issued
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.labels_updated
    }
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} updated={} labels_updated={} unchanged={} skipped={}",
            self.created, self.updated, self.labels_updated, self.unchanged, self.skipped
        )
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::catalog::VersionInfo;
    use crate::crd::{KubernetesServicesOptions, SystemImages};

    pub const NS: &str = "cattle-global-data";

    pub fn images(etcd: &str) -> SystemImages {
        let mut images = SystemImages::new();
        images.insert("etcd".to_string(), etcd.to_string());
        images
    }

    pub fn kubelet_options(max_pods: &str) -> KubernetesServicesOptions {
        let mut options = KubernetesServicesOptions::default();
        options
            .kubelet
            .insert("max-pods".to_string(), max_pods.to_string());
        options
    }

    pub fn bounds(min: &str, max: &str, deprecate: &str) -> VersionInfo {
        VersionInfo {
            min_rancher_version: min.to_string(),
            max_rancher_version: max.to_string(),
            deprecate_rancher_version: deprecate.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_record() {
        let mut summary = ReconcileSummary::default();
        summary.record(UpsertOutcome::Created);
        summary.record(UpsertOutcome::PayloadUpdated);
        summary.record(UpsertOutcome::LabelsUpdated);
        summary.record(UpsertOutcome::Unchanged);
        summary.record(UpsertOutcome::AlreadyExisted);
        assert_eq!(summary.writes(), 3);
        assert_eq!(summary.unchanged, 2);
        assert_eq!(
            summary.to_string(),
            "created=1 updated=1 labels_updated=1 unchanged=2 skipped=0"
        );
    }
}
