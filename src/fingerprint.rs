//! Change detection for re-registrations.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::service::Service;
use crate::Result;

/// Structural fingerprint of a service descriptor.
///
/// Hashes the canonical JSON encoding, so lists (endpoints, nodes) are
/// order-sensitive and metadata maps are not.
pub fn fingerprint(service: &Service) -> Result<u64> {
    let encoded = serde_json::to_vec(service)?;
    let mut hasher = Sha256::new();
    hasher.update(b"etcd-service-registry:fingerprint:v1:");
    hasher.update(&encoded);
    let hash = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash[..8]);
    Ok(u64::from_le_bytes(prefix))
}

/// Last fingerprint written per service name.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    registered: Mutex<HashMap<String, u64>>,
}

impl ChangeDetector {
    /// Create an empty detector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a write for `service` can be skipped.
    ///
    /// Only an unchanged fingerprint on a still-live lease is skippable.
    pub async fn should_skip(&self, service: &str, fingerprint: u64, lease_expired: bool) -> bool {
        if lease_expired {
            return false;
        }
        let registered = self.registered.lock().await;
        registered.get(service) == Some(&fingerprint)
    }

    /// Remember the fingerprint of a completed write.
    pub async fn record(&self, service: &str, fingerprint: u64) {
        self.registered
            .lock()
            .await
            .insert(service.to_string(), fingerprint);
    }

    /// Drop the cached fingerprint for `service`.
    pub async fn forget(&self, service: &str) {
        self.registered.lock().await.remove(service);
    }

    /// Cached fingerprint for `service`, if any.
    pub async fn get(&self, service: &str) -> Option<u64> {
        self.registered.lock().await.get(service).copied()
    }
}
