//! Compatibility gating of catalog entries against the running
//! management-plane version.

use crate::catalog::VersionInfo;
use crate::error::Result;
use crate::version;

/// Decides which catalog entries apply to a management-plane version
#[derive(Debug, Clone)]
pub struct CompatibilityFilter {
    running_version: String,
}

impl CompatibilityFilter {
    pub fn new(running_version: impl Into<String>) -> Self {
        Self {
            running_version: running_version.into(),
        }
    }

    pub fn running_version(&self) -> &str {
        &self.running_version
    }

    /// Whether an entry is skipped entirely, judged by its own record.
    ///
    /// The deprecation bound is checked first. A min bound alone decides the
    /// rest even when a max bound is present, so clusters upgraded past the
    /// max keep getting their metadata.
    pub fn is_deprecated(&self, info: &VersionInfo) -> Result<bool> {
        if !info.deprecate_rancher_version.is_empty()
            && version::gte(&self.running_version, &info.deprecate_rancher_version)?
        {
            return Ok(true);
        }
        if !info.min_rancher_version.is_empty()
            && version::lt(&self.running_version, &info.min_rancher_version)?
        {
            return Ok(true);
        }
        Ok(false)
    }

    /// Whether an entry is left out of the current-version aggregate, judged
    /// by its major version's record.
    pub fn is_excluded_from_current(&self, major_info: &VersionInfo) -> Result<bool> {
        if !major_info.max_rancher_version.is_empty()
            && version::gt(&self.running_version, &major_info.max_rancher_version)?
        {
            return Ok(true);
        }
        Ok(false)
    }
}
