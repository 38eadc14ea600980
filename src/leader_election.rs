//! Lease-based leader election
//!
//! Only one operator replica may run reconciliation passes at a time, since
//! passes must not overlap. Replicas block in [`LeaderElector::acquire`]
//! until the holder's lease expires or is released.

use crate::error::{MetadataError, Result};
use chrono::{DateTime, Utc};
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, ObjectMeta};
use kube::api::{Api, PostParams};
use kube::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

const LEASE_NAME: &str = "kdm-operator-leader";
const LEASE_DURATION_SECS: i32 = 15;
const RENEW_INTERVAL: Duration = Duration::from_secs(10);
const RETRY_INTERVAL: Duration = Duration::from_secs(5);
const SERVICE_ACCOUNT_NAMESPACE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Namespace for the Lease: explicit argument, then the service account
/// namespace, then `default`.
pub fn detect_namespace(explicit: &str) -> String {
    if !explicit.is_empty() {
        return explicit.to_string();
    }
    std::fs::read_to_string(SERVICE_ACCOUNT_NAMESPACE)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "default".to_string())
}

/// What a replica may do with the current lease
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeaseClaim {
    /// We already hold it
    Renew,
    /// Expired or released by its holder
    Takeover,
    Held,
}

fn claim_for(spec: Option<&LeaseSpec>, identity: &str, now: DateTime<Utc>) -> LeaseClaim {
    let holder = spec.and_then(|s| s.holder_identity.as_deref());
    if holder == Some(identity) {
        return LeaseClaim::Renew;
    }
    if holder.is_none() || is_expired(spec, now) {
        return LeaseClaim::Takeover;
    }
    LeaseClaim::Held
}

fn is_expired(spec: Option<&LeaseSpec>, now: DateTime<Utc>) -> bool {
    let duration_secs = spec
        .and_then(|s| s.lease_duration_seconds)
        .unwrap_or(LEASE_DURATION_SECS) as i64;
    match spec.and_then(|s| s.renew_time.as_ref()) {
        Some(MicroTime(t)) => now.signed_duration_since(*t).num_seconds() > duration_secs,
        None => true,
    }
}

/// Spec written when claiming or renewing the lease
fn claimed_spec(previous: Option<&LeaseSpec>, identity: &str, now: DateTime<Utc>, takeover: bool) -> LeaseSpec {
    let transitions = previous.and_then(|s| s.lease_transitions).unwrap_or(0);
    LeaseSpec {
        holder_identity: Some(identity.to_string()),
        lease_duration_seconds: Some(LEASE_DURATION_SECS),
        acquire_time: if takeover {
            Some(MicroTime(now))
        } else {
            previous.and_then(|s| s.acquire_time.clone())
        },
        renew_time: Some(MicroTime(now)),
        lease_transitions: Some(if takeover && previous.is_some() {
            transitions + 1
        } else {
            transitions
        }),
        ..Default::default()
    }
}

fn is_conflict(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(ae) if ae.code == 409)
}

pub struct LeaderElector {
    lease_api: Api<Lease>,
    identity: String,
}

impl LeaderElector {
    pub fn new(client: Client, namespace: &str) -> Self {
        let identity = std::env::var("POD_NAME")
            .or_else(|_| std::env::var("HOSTNAME"))
            .unwrap_or_else(|_| format!("kdm-operator-{:08x}", rand::random::<u32>()));
        info!(identity = %identity, namespace = %namespace, "Initialized leader elector");
        Self {
            lease_api: Api::<Lease>::namespaced(client, namespace),
            identity,
        }
    }

    /// Blocks until the lease is acquired.
    pub async fn acquire(&self) {
        info!(identity = %self.identity, "Waiting to acquire leader lease '{}'", LEASE_NAME);
        loop {
            match self.try_acquire().await {
                Ok(true) => {
                    info!(identity = %self.identity, "Acquired leader lease");
                    return;
                }
                Ok(false) => debug!("Lease held by another replica, retrying in {:?}", RETRY_INTERVAL),
                Err(e) => warn!("Lease acquisition error: {}, retrying in {:?}", e, RETRY_INTERVAL),
            }
            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }

    /// `Ok(false)` once leadership is lost.
    pub async fn renew(&self) -> Result<bool> {
        let lease = self.lease_api.get(LEASE_NAME).await?;
        if claim_for(lease.spec.as_ref(), &self.identity, Utc::now()) != LeaseClaim::Renew {
            return Ok(false);
        }
        self.replace_spec(&lease, false).await
    }

    /// Clears the holder so a standby replica can take over immediately.
    pub async fn release(&self) {
        info!(identity = %self.identity, "Releasing leader lease");
        let mut lease = match self.lease_api.get(LEASE_NAME).await {
            Ok(l) => l,
            Err(e) => {
                warn!("Failed to read lease for release: {}", e);
                return;
            }
        };
        let held = lease
            .spec
            .as_ref()
            .and_then(|s| s.holder_identity.as_deref())
            == Some(self.identity.as_str());
        if !held {
            debug!("Lease not held by this replica, skipping release");
            return;
        }
        if let Some(spec) = lease.spec.as_mut() {
            spec.holder_identity = None;
        }
        match self
            .lease_api
            .replace(LEASE_NAME, &PostParams::default(), &lease)
            .await
        {
            Ok(_) => info!("Released leader lease"),
            Err(e) => warn!("Failed to release leader lease: {}", e),
        }
    }

    pub fn renew_interval(&self) -> Duration {
        RENEW_INTERVAL
    }

    async fn try_acquire(&self) -> Result<bool> {
        let existing = match self.lease_api.get(LEASE_NAME).await {
            Ok(existing) => existing,
            Err(e) => match MetadataError::from(e) {
                MetadataError::NotFound(_) => return self.create_lease().await,
                other => return Err(other),
            },
        };
        match claim_for(existing.spec.as_ref(), &self.identity, Utc::now()) {
            LeaseClaim::Renew => self.replace_spec(&existing, false).await,
            LeaseClaim::Takeover => self.replace_spec(&existing, true).await,
            LeaseClaim::Held => Ok(false),
        }
    }

    async fn create_lease(&self) -> Result<bool> {
        let lease = Lease {
            metadata: ObjectMeta {
                name: Some(LEASE_NAME.to_string()),
                ..Default::default()
            },
            spec: Some(claimed_spec(None, &self.identity, Utc::now(), true)),
        };
        match self.lease_api.create(&PostParams::default(), &lease).await {
            Ok(_) => Ok(true),
            Err(e) if is_conflict(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace_spec(&self, existing: &Lease, takeover: bool) -> Result<bool> {
        let mut updated = existing.clone();
        updated.spec = Some(claimed_spec(
            existing.spec.as_ref(),
            &self.identity,
            Utc::now(),
            takeover,
        ));
        match self
            .lease_api
            .replace(LEASE_NAME, &PostParams::default(), &updated)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_conflict(&e) => {
                warn!("Lease conflict, another replica won the update");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn spec(holder: Option<&str>, renewed: DateTime<Utc>) -> LeaseSpec {
        LeaseSpec {
            holder_identity: holder.map(str::to_string),
            lease_duration_seconds: Some(LEASE_DURATION_SECS),
            renew_time: Some(MicroTime(renewed)),
            lease_transitions: Some(2),
            ..Default::default()
        }
    }

    #[test]
    fn test_detect_namespace_prefers_explicit() {
        assert_eq!(detect_namespace("cattle-system"), "cattle-system");
    }

    #[test]
    fn test_claim_for() {
        let now = Utc::now();
        let fresh = spec(Some("replica-a"), now - ChronoDuration::seconds(3));
        assert_eq!(claim_for(Some(&fresh), "replica-a", now), LeaseClaim::Renew);
        assert_eq!(claim_for(Some(&fresh), "replica-b", now), LeaseClaim::Held);

        let stale = spec(Some("replica-a"), now - ChronoDuration::seconds(60));
        assert_eq!(claim_for(Some(&stale), "replica-b", now), LeaseClaim::Takeover);

        let released = spec(None, now);
        assert_eq!(claim_for(Some(&released), "replica-b", now), LeaseClaim::Takeover);
        assert_eq!(claim_for(None, "replica-b", now), LeaseClaim::Takeover);
    }

    #[test]
    fn test_claimed_spec_counts_transitions() {
        let now = Utc::now();
        let previous = spec(Some("replica-a"), now - ChronoDuration::seconds(60));

        let taken = claimed_spec(Some(&previous), "replica-b", now, true);
        assert_eq!(taken.holder_identity.as_deref(), Some("replica-b"));
        assert_eq!(taken.lease_transitions, Some(3));
        assert_eq!(taken.acquire_time, Some(MicroTime(now)));

        let renewed = claimed_spec(Some(&previous), "replica-a", now, false);
        assert_eq!(renewed.lease_transitions, Some(2));
        assert_eq!(renewed.renew_time, Some(MicroTime(now)));

        let created = claimed_spec(None, "replica-a", now, true);
        assert_eq!(created.lease_transitions, Some(0));
    }
}
