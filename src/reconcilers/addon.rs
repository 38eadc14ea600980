//! Addon template reconciler
//!
//! One addon name spans a template per Kubernetes version, so each template
//! is stored under `<lowercase addon>-<version>`.

use super::{PassContext, ReconcileSummary};
use crate::crd::addon_name;
use crate::error::Result;
use crate::store::MetadataPayload;

pub async fn reconcile_addons(ctx: &PassContext<'_>) -> Result<ReconcileSummary> {
    let mut summary = ReconcileSummary::default();
    for (addon, templates) in &ctx.catalog.addon_templates {
        for (k8s_version, template) in templates {
            let outcome = ctx
                .differ
                .upsert(
                    &addon_name(addon, k8s_version),
                    MetadataPayload::Template(template.clone()),
                    ctx.vendor.has_addon_template(addon, k8s_version),
                )
                .await?;
            summary.record(outcome);
        }
    }
    Ok(summary)
}
