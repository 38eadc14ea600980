//! Kubernetes Distribution Metadata Operator
//!
//! Applies a catalog of Kubernetes distribution metadata to the management
//! plane: the system images, service options and addon templates of every
//! Kubernetes version it can provision, plus the settings that tell users
//! which versions are current and which one is the default.
//!
//! ## Custom Resources
//!
//! All live in `management.cattle.io/v3`, in the global data namespace:
//!
//! - `RkeK8sSystemImage`: container images for one Kubernetes version
//! - `RkeK8sServiceOption`: per-role service flags for one Kubernetes version
//! - `RkeAddon`: an addon template for one Kubernetes version
//! - `RkeK8sWindowsSystemImage`: Windows node images for one Kubernetes version
//!
//! Objects whose version ships in the vendor default catalog carry the
//! `io.cattle.rke_store: "false"` label.
//!
//! ## Example
//!
//! ```no_run
//! use kdm_operator::{MemoryStore, LoggingSettingsSink, MetadataCatalog, ReconciliationDriver};
//! use std::sync::Arc;
//!
//! # async fn run() -> kdm_operator::Result<()> {
//! let vendor = MetadataCatalog::load("data.json")?;
//! let driver = ReconciliationDriver::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(LoggingSettingsSink),
//!     vendor,
//!     "v2.5.1",
//! );
//! driver.reconcile_defaults().await?;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod catalog;
pub mod compat;
pub mod crd;
pub mod differ;
pub mod driver;
pub mod error;
pub mod leader_election;
pub mod reconcilers;
pub mod settings;
pub mod store;
pub mod version;

pub use aggregate::{VersionAggregate, VersionAggregator};
pub use catalog::{MetadataCatalog, VersionInfo};
pub use compat::CompatibilityFilter;
pub use crd::{
    KubernetesServicesOptions, RkeAddon, RkeK8sServiceOption, RkeK8sSystemImage,
    RkeK8sWindowsSystemImage, SystemImages,
};
pub use driver::{PassReport, ReconciliationDriver};
pub use error::{MetadataError, Result};
pub use settings::{KubeSettingsSink, LoggingSettingsSink, SettingsSink};
pub use store::{KubeMetadataStore, MemoryStore, MetadataStore};
