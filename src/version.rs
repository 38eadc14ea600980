//! Version comparison for management-plane and Kubernetes version strings
//!
//! Management-plane versions are short dotted versions (`2.3`, `v2.4.5`,
//! `2.5.0-rc1`). Comparison pads the numeric core to four segments, orders a
//! pre-release before its release and ignores build metadata. Anything that
//! does not parse is an error; callers decide whether that fails the pass.

use crate::error::{MetadataError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Version assumed for development builds of the management plane
pub const DEV_MANAGEMENT_VERSION: &str = "2.3";

const CORE_SEGMENTS: usize = 4;

/// A parsed, comparable version
#[derive(Debug, Clone)]
pub struct Version {
    core: [u64; CORE_SEGMENTS],
    pre: Vec<Identifier>,
    raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Identifier {
    Numeric(u64),
    Alpha(String),
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Identifier::Numeric(a), Identifier::Numeric(b)) => a.cmp(b),
            (Identifier::Numeric(_), Identifier::Alpha(_)) => Ordering::Less,
            (Identifier::Alpha(_), Identifier::Numeric(_)) => Ordering::Greater,
            (Identifier::Alpha(a), Identifier::Alpha(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || MetadataError::VersionParse(format!("invalid version {:?}", s));

        let trimmed = s.trim();
        let unprefixed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        // Build metadata never participates in ordering
        let without_build = unprefixed.split('+').next().unwrap_or_default();
        let (core_part, pre_part) = match without_build.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (without_build, None),
        };

        let segments: Vec<&str> = core_part.split('.').collect();
        if core_part.is_empty() || segments.len() > CORE_SEGMENTS {
            return Err(invalid());
        }
        let mut core = [0u64; CORE_SEGMENTS];
        for (slot, segment) in core.iter_mut().zip(&segments) {
            if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = segment.parse().map_err(|_| invalid())?;
        }

        let pre = match pre_part {
            None => Vec::new(),
            Some(pre) => {
                let mut identifiers = Vec::new();
                for ident in pre.split(['.', '-']) {
                    if ident.is_empty() || !ident.bytes().all(|b| b.is_ascii_alphanumeric()) {
                        return Err(invalid());
                    }
                    identifiers.push(match ident.parse::<u64>() {
                        Ok(n) => Identifier::Numeric(n),
                        Err(_) => Identifier::Alpha(ident.to_ascii_lowercase()),
                    });
                }
                identifiers
            }
        };

        Ok(Version {
            core,
            pre,
            raw: trimmed.to_string(),
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.core.cmp(&other.core).then_with(|| {
            match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            }
        })
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compare two version strings, failing if either is malformed
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    let a: Version = a.parse()?;
    let b: Version = b.parse()?;
    Ok(a.cmp(&b))
}

/// `a >= b`
pub fn gte(a: &str, b: &str) -> Result<bool> {
    Ok(compare(a, b)? != Ordering::Less)
}

/// `a < b`
pub fn lt(a: &str, b: &str) -> Result<bool> {
    Ok(compare(a, b)? == Ordering::Less)
}

/// `a > b`
pub fn gt(a: &str, b: &str) -> Result<bool> {
    Ok(compare(a, b)? == Ordering::Greater)
}

/// Extract the `vX.Y` major-version prefix of a Kubernetes version string.
///
/// `v1.20.4-rancher1-1` becomes `v1.20`.
pub fn major_version_of(version: &str) -> Result<String> {
    let mut parts = version.split('.');
    match (parts.next(), parts.next()) {
        (Some(major), Some(minor)) if !major.is_empty() && !minor.is_empty() => {
            Ok(format!("{}.{}", major, minor))
        }
        _ => Err(MetadataError::VersionParse(format!(
            "cannot extract major version from {:?}",
            version
        ))),
    }
}

/// Map the running management-plane version to something comparable.
///
/// Development builds report things like `dev` or `master-head`; those are
/// gated as [`DEV_MANAGEMENT_VERSION`].
pub fn normalize_management_version(raw: &str) -> String {
    let trimmed = raw.trim();
    let is_dev = trimmed.is_empty()
        || trimmed == "dev"
        || trimmed == "master"
        || trimmed.starts_with("master-");
    if is_dev || trimmed.parse::<Version>().is_err() {
        return DEV_MANAGEMENT_VERSION.to_string();
    }
    trimmed.strip_prefix('v').unwrap_or(trimmed).to_string()
}
