//! Service option reconciler

use super::{PassContext, ReconcileSummary};
use crate::error::Result;
use crate::store::MetadataPayload;

pub async fn reconcile_service_options(ctx: &PassContext<'_>) -> Result<ReconcileSummary> {
    let mut summary = ReconcileSummary::default();
    for (k8s_version, options) in &ctx.catalog.service_options {
        let outcome = ctx
            .differ
            .upsert(
                k8s_version,
                MetadataPayload::ServiceOptions(options.clone()),
                ctx.vendor.has_service_options(k8s_version),
            )
            .await?;
        summary.record(outcome);
    }
    Ok(summary)
}
