//! Per-service lease tracking.
//!
//! Renewal is lazy: a tracked lease gets one keepalive each time its service
//! is registered again, and nothing renews it in between. Callers that need
//! continuous liveness must re-register more often than the TTL.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::store::{KvStore, LeaseId, StoreError};
use crate::{Error, Result};

/// Liveness of the lease tracked for a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseStatus {
    /// No lease is tracked, either never granted or registered without TTL.
    Untracked,
    /// The tracked lease answered a keepalive.
    Alive(LeaseId),
    /// The store no longer knows the tracked lease.
    Expired(LeaseId),
}

impl LeaseStatus {
    /// Whether the tracked lease was found expired.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired(_))
    }
}

/// Tracks at most one lease per service name.
#[derive(Debug, Default)]
pub struct LeaseManager {
    leases: Mutex<HashMap<String, LeaseId>>,
}

impl LeaseManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renew the tracked lease for `service` once.
    ///
    /// A lease the store no longer knows is reported as
    /// [`LeaseStatus::Expired`] and forgotten; every other store failure is
    /// returned.
    pub async fn ensure_live<S: KvStore + ?Sized>(
        &self,
        store: &S,
        service: &str,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<LeaseStatus> {
        let Some(lease) = self.get(service).await else {
            return Ok(LeaseStatus::Untracked);
        };

        match with_deadline(deadline, timeout, store.keep_alive_once(lease)).await {
            Ok(()) => {
                debug!(service = %service, lease_id = lease, "Lease renewed");
                Ok(LeaseStatus::Alive(lease))
            }
            Err(Error::Store(StoreError::LeaseNotFound(_))) => {
                warn!(service = %service, lease_id = lease, "Lease expired, forcing re-registration");
                self.forget_if(service, lease).await;
                Ok(LeaseStatus::Expired(lease))
            }
            Err(e) => Err(e),
        }
    }

    /// Grant a fresh lease for `ttl`, or `None` when `ttl` is zero.
    ///
    /// The new lease is not tracked until [`track`](Self::track) is called.
    pub async fn grant<S: KvStore + ?Sized>(
        &self,
        store: &S,
        ttl: Duration,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<Option<LeaseId>> {
        if ttl.is_zero() {
            return Ok(None);
        }
        let lease = with_deadline(deadline, timeout, store.grant_lease(ttl)).await?;
        debug!(lease_id = lease, ttl_secs = ttl.as_secs().max(1), "Lease granted");
        Ok(Some(lease))
    }

    /// Track `lease` for `service`, abandoning any previous lease.
    pub async fn track(&self, service: &str, lease: LeaseId) {
        let previous = self.leases.lock().await.insert(service.to_string(), lease);
        if let Some(previous) = previous.filter(|p| *p != lease) {
            debug!(service = %service, lease_id = lease, previous = previous, "Lease superseded");
        }
    }

    /// Stop tracking any lease for `service`.
    pub async fn forget(&self, service: &str) {
        self.leases.lock().await.remove(service);
    }

    /// Lease currently tracked for `service`.
    pub async fn get(&self, service: &str) -> Option<LeaseId> {
        self.leases.lock().await.get(service).copied()
    }

    // A concurrent register may have tracked a newer lease meanwhile.
    async fn forget_if(&self, service: &str, lease: LeaseId) {
        let mut leases = self.leases.lock().await;
        if leases.get(service) == Some(&lease) {
            leases.remove(service);
        }
    }
}

/// Run a store call under the operation deadline.
pub(crate) async fn with_deadline<T, F>(deadline: Instant, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, StoreError>>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(res) => res.map_err(Error::from),
        Err(_) => Err(Error::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn deadline() -> Instant {
        Instant::now() + TIMEOUT
    }

    #[tokio::test]
    async fn untracked_without_lease() {
        let store = MemoryStore::new();
        let leases = LeaseManager::new();
        let status = leases.ensure_live(&store, "svc", deadline(), TIMEOUT).await.unwrap();
        assert_eq!(status, LeaseStatus::Untracked);
    }

    #[tokio::test]
    async fn zero_ttl_grants_nothing() {
        let store = MemoryStore::new();
        let leases = LeaseManager::new();
        let lease = leases.grant(&store, Duration::ZERO, deadline(), TIMEOUT).await.unwrap();
        assert_eq!(lease, None);
        assert_eq!(store.lease_count().await, 0);
    }

    #[tokio::test]
    async fn alive_then_expired_after_revoke() {
        let store = MemoryStore::new();
        let leases = LeaseManager::new();
        let lease = leases
            .grant(&store, Duration::from_secs(30), deadline(), TIMEOUT)
            .await
            .unwrap()
            .expect("non-zero ttl grants a lease");
        leases.track("svc", lease).await;

        let status = leases.ensure_live(&store, "svc", deadline(), TIMEOUT).await.unwrap();
        assert_eq!(status, LeaseStatus::Alive(lease));

        store.revoke_lease(lease).await;
        let status = leases.ensure_live(&store, "svc", deadline(), TIMEOUT).await.unwrap();
        assert!(status.is_expired());
        assert_eq!(leases.get("svc").await, None);
    }

    #[tokio::test]
    async fn track_supersedes_previous_lease() {
        let leases = LeaseManager::new();
        leases.track("svc", 1).await;
        leases.track("svc", 2).await;
        assert_eq!(leases.get("svc").await, Some(2));

        leases.forget("svc").await;
        assert_eq!(leases.get("svc").await, None);
    }

    #[tokio::test]
    async fn expired_check_keeps_newer_lease() {
        let leases = LeaseManager::new();
        leases.track("svc", 2).await;
        leases.forget_if("svc", 1).await;
        assert_eq!(leases.get("svc").await, Some(2));
    }
}
