//! Reconciliation driver
//!
//! Entry point for a catalog refresh. A pass reconciles system images,
//! publishes the version aggregate, then reconciles service options, addons
//! and the Windows variants. The first error ends the pass; the caller
//! retries the whole pass on its next trigger. Passes must not overlap.

use crate::aggregate::{VersionAggregate, VersionAggregator};
use crate::catalog::MetadataCatalog;
use crate::compat::CompatibilityFilter;
use crate::crd::GLOBAL_NAMESPACE;
use crate::differ::CatalogDiffer;
use crate::error::Result;
use crate::reconcilers::{
    reconcile_addons, reconcile_service_options, reconcile_system_images,
    reconcile_windows_service_options, reconcile_windows_system_images, PassContext,
    ReconcileSummary,
};
use crate::settings::{SettingsPublisher, SettingsSink};
use crate::store::MetadataStore;
use crate::version;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Outcome of one successful pass
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub system_images: ReconcileSummary,
    pub service_options: ReconcileSummary,
    pub addons: ReconcileSummary,
    pub windows_system_images: ReconcileSummary,
    pub windows_service_options: ReconcileSummary,
    pub aggregate: VersionAggregate,
}

impl PassReport {
    /// Create and update calls issued across all kinds
    pub fn writes(&self) -> usize {
        self.system_images.writes()
            + self.service_options.writes()
            + self.addons.writes()
            + self.windows_system_images.writes()
            + self.windows_service_options.writes()
    }
}

/// Runs reconciliation passes against a store and a settings sink
pub struct ReconciliationDriver {
    store: Arc<dyn MetadataStore>,
    settings: Arc<dyn SettingsSink>,
    vendor: MetadataCatalog,
    filter: CompatibilityFilter,
    namespace: String,
}

impl ReconciliationDriver {
    /// `vendor` is the vendor default catalog; `management_version` is the
    /// running management-plane version as reported by the build.
    pub fn new(
        store: Arc<dyn MetadataStore>,
        settings: Arc<dyn SettingsSink>,
        vendor: MetadataCatalog,
        management_version: &str,
    ) -> Self {
        let running = version::normalize_management_version(management_version);
        info!("Gating Kubernetes metadata for management version {}", running);
        Self {
            store,
            settings,
            vendor,
            filter: CompatibilityFilter::new(running),
            namespace: GLOBAL_NAMESPACE.to_string(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn running_version(&self) -> &str {
        self.filter.running_version()
    }

    /// Replace the vendor default catalog used for provenance
    pub fn set_vendor_catalog(&mut self, vendor: MetadataCatalog) {
        self.vendor = vendor;
    }

    /// Apply the vendor default catalog itself
    pub async fn reconcile_defaults(&self) -> Result<PassReport> {
        self.reconcile(&self.vendor).await
    }

    /// Apply one catalog snapshot
    pub async fn reconcile(&self, catalog: &MetadataCatalog) -> Result<PassReport> {
        info!(
            "Starting metadata reconciliation: {} system image sets, {} service option sets, {} addons",
            catalog.system_images.len(),
            catalog.service_options.len(),
            catalog.addon_templates.len()
        );

        let ctx = PassContext {
            differ: CatalogDiffer::new(self.store.as_ref(), &self.namespace),
            catalog,
            vendor: &self.vendor,
            filter: &self.filter,
        };

        let system_images = reconcile_system_images(&ctx).await?;
        let aggregate = VersionAggregator::new(catalog, self.filter.running_version())
            .aggregate(&system_images.candidates)?;
        SettingsPublisher::new(self.settings.as_ref())
            .publish(&aggregate)
            .await?;

        let report = PassReport {
            system_images: system_images.summary,
            service_options: reconcile_service_options(&ctx).await?,
            addons: reconcile_addons(&ctx).await?,
            windows_system_images: reconcile_windows_system_images(&ctx).await?,
            windows_service_options: reconcile_windows_service_options(&ctx).await?,
            aggregate,
        };

        info!(
            "Metadata reconciliation finished: system images [{}], service options [{}], addons [{}], windows system images [{}], windows service options [{}], default version {}",
            report.system_images,
            report.service_options,
            report.addons,
            report.windows_system_images,
            report.windows_service_options,
            report.aggregate.default_version
        );
        Ok(report)
    }

    /// Seed from the vendor catalog, then apply the catalog file at
    /// `catalog_path` immediately and once per `interval` after that.
    ///
    /// Passes run one at a time on the calling task. A failed pass is logged
    /// and retried on the next tick. Never returns.
    pub async fn run(&self, catalog_path: &Path, interval: Duration) {
        if let Err(e) = self.reconcile_defaults().await {
            error!("Failed to apply default catalog: {}", e);
        }

        // the first tick completes immediately
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let catalog = match MetadataCatalog::load(catalog_path) {
                Ok(catalog) => catalog,
                Err(e) => {
                    error!("Failed to load catalog {}: {}", catalog_path.display(), e);
                    continue;
                }
            };
            match self.reconcile(&catalog).await {
                Ok(report) => info!("Catalog refresh complete, {} writes", report.writes()),
                Err(e) => error!("Catalog refresh failed, retrying next interval: {}", e),
            }
        }
    }
}
