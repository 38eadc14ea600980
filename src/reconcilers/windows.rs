//! Windows system image and service option reconcilers
//!
//! Windows objects are named `w<version>` so they never collide with the
//! Linux objects of the same version. Windows service options share the
//! service option kind.

use super::{PassContext, ReconcileSummary};
use crate::crd::windows_name;
use crate::error::Result;
use crate::store::MetadataPayload;

pub async fn reconcile_windows_system_images(ctx: &PassContext<'_>) -> Result<ReconcileSummary> {
    let mut summary = ReconcileSummary::default();
    for (k8s_version, images) in &ctx.catalog.windows_system_images {
        let outcome = ctx
            .differ
            .upsert(
                &windows_name(k8s_version),
                MetadataPayload::WindowsSystemImages(images.clone()),
                ctx.vendor.has_windows_system_images(k8s_version),
            )
            .await?;
        summary.record(outcome);
    }
    Ok(summary)
}

pub async fn reconcile_windows_service_options(ctx: &PassContext<'_>) -> Result<ReconcileSummary> {
    let mut summary = ReconcileSummary::default();
    for (k8s_version, options) in &ctx.catalog.windows_service_options {
        let outcome = ctx
            .differ
            .upsert(
                &windows_name(k8s_version),
                MetadataPayload::ServiceOptions(options.clone()),
                ctx.vendor.has_windows_service_options(k8s_version),
            )
            .await?;
        summary.record(outcome);
    }
    Ok(summary)
}
