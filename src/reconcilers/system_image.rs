//! System image reconciler
//!
//! The only kind gated by compatibility: deprecated versions are skipped, and
//! versions whose major line is past its max management-plane version are
//! reconciled but kept out of the current-version candidates.

use super::{PassContext, ReconcileSummary};
use crate::aggregate::CurrentCandidate;
use crate::error::Result;
use crate::store::MetadataPayload;
use crate::version;
use tracing::debug;

/// Result of reconciling the system images of one snapshot
#[derive(Debug, Clone, Default)]
pub struct SystemImageOutcome {
    pub summary: ReconcileSummary,
    /// Versions eligible to become current, sorted
    pub candidates: Vec<CurrentCandidate>,
    /// Versions skipped as deprecated, sorted
    pub deprecated: Vec<String>,
    /// Versions reconciled but not eligible to become current, sorted
    pub max_incompatible: Vec<String>,
}

pub async fn reconcile_system_images(ctx: &PassContext<'_>) -> Result<SystemImageOutcome> {
    let mut outcome = SystemImageOutcome::default();

    for (k8s_version, images) in &ctx.catalog.system_images {
        if let Some(info) = ctx.catalog.version_info.get(k8s_version) {
            if ctx.filter.is_deprecated(info)? {
                outcome.deprecated.push(k8s_version.clone());
                outcome.summary.skipped += 1;
                continue;
            }
        }

        let upserted = ctx
            .differ
            .upsert(
                k8s_version,
                MetadataPayload::SystemImages(images.clone()),
                ctx.vendor.has_system_images(k8s_version),
            )
            .await?;
        outcome.summary.record(upserted);

        let major = version::major_version_of(k8s_version)?;
        if let Some(major_info) = ctx.catalog.version_info.get(&major) {
            if ctx.filter.is_excluded_from_current(major_info)? {
                outcome.max_incompatible.push(k8s_version.clone());
                continue;
            }
        }
        outcome
            .candidates
            .push(CurrentCandidate::new(major, k8s_version.clone()));
    }

    outcome.candidates.sort();
    outcome.deprecated.sort();
    outcome.max_incompatible.sort();
    debug!(
        "System images: deprecated {:?}, max incompatible {:?}",
        outcome.deprecated, outcome.max_incompatible
    );
    Ok(outcome)
}
