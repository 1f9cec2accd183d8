//! In-process store with etcd-like lease semantics.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

use super::{GetOptions, KeyValue, KvStore, LeaseId, SortOrder, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    lease: Option<LeaseId>,
}

#[derive(Debug, Clone)]
struct Lease {
    ttl: Duration,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    leases: HashMap<LeaseId, Lease>,
    next_lease: LeaseId,
}

impl State {
    /// Drop expired leases together with every key bound to them.
    fn purge(&mut self, now: Instant) {
        let expired: Vec<LeaseId> = self
            .leases
            .iter()
            .filter(|(_, lease)| lease.expires_at <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            self.drop_lease(id);
        }
    }

    fn drop_lease(&mut self, id: LeaseId) -> bool {
        if self.leases.remove(&id).is_none() {
            return false;
        }
        self.entries.retain(|_, entry| entry.lease != Some(id));
        trace!(lease_id = id, "Lease dropped");
        true
    }
}

/// Keyspace held in memory.
///
/// Leases run on the tokio clock, so tests can pause and advance time. Clones
/// share the same keyspace.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke a lease and delete every key bound to it.
    ///
    /// Returns `false` if the lease did not exist.
    pub async fn revoke_lease(&self, lease: LeaseId) -> bool {
        let mut state = self.state.lock().await;
        state.purge(Instant::now());
        state.drop_lease(lease)
    }

    /// All live keys in ascending order.
    pub async fn keys(&self) -> Vec<String> {
        let mut state = self.state.lock().await;
        state.purge(Instant::now());
        state.entries.keys().cloned().collect()
    }

    /// Lease bound to `key`, if the key exists and is leased.
    pub async fn lease_of(&self, key: &str) -> Option<LeaseId> {
        let mut state = self.state.lock().await;
        state.purge(Instant::now());
        state.entries.get(key).and_then(|entry| entry.lease)
    }

    /// Number of live leases.
    pub async fn lease_count(&self) -> usize {
        let mut state = self.state.lock().await;
        state.purge(Instant::now());
        state.leases.len()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str, options: GetOptions) -> Result<Vec<KeyValue>, StoreError> {
        let mut state = self.state.lock().await;
        state.purge(Instant::now());

        let mut kvs: Vec<KeyValue> = if options.prefix {
            state
                .entries
                .range(key.to_string()..)
                .take_while(|(k, _)| k.starts_with(key))
                .map(|(k, entry)| KeyValue {
                    key: k.clone(),
                    value: entry.value.clone(),
                })
                .collect()
        } else {
            state
                .entries
                .get(key)
                .map(|entry| KeyValue {
                    key: key.to_string(),
                    value: entry.value.clone(),
                })
                .into_iter()
                .collect()
        };

        if options.sort == Some(SortOrder::Descend) {
            kvs.reverse();
        }
        Ok(kvs)
    }

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        lease: Option<LeaseId>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.purge(Instant::now());

        if let Some(id) = lease {
            if !state.leases.contains_key(&id) {
                return Err(StoreError::LeaseNotFound(id));
            }
        }
        state.entries.insert(key.to_string(), Entry { value, lease });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.purge(Instant::now());
        state.entries.remove(key);
        Ok(())
    }

    async fn grant_lease(&self, ttl: Duration) -> Result<LeaseId, StoreError> {
        let ttl = Duration::from_secs(ttl.as_secs().max(1));
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.purge(now);

        state.next_lease += 1;
        let id = state.next_lease;
        state.leases.insert(
            id,
            Lease {
                ttl,
                expires_at: now + ttl,
            },
        );
        trace!(lease_id = id, ttl_secs = ttl.as_secs(), "Lease granted");
        Ok(id)
    }

    async fn keep_alive_once(&self, lease: LeaseId) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.purge(now);

        match state.leases.get_mut(&lease) {
            Some(entry) => {
                entry.expires_at = now + entry.ttl;
                Ok(())
            }
            None => Err(StoreError::LeaseNotFound(lease)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prefix_get_respects_sort_order() {
        let store = MemoryStore::new();
        for key in ["/p/b", "/p/a", "/p/c", "/q/a"] {
            store.put(key, key.as_bytes().to_vec(), None).await.unwrap();
        }

        let asc = store
            .get("/p/", GetOptions::new().with_prefix().with_sort(SortOrder::Ascend))
            .await
            .unwrap();
        let keys: Vec<_> = asc.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, ["/p/a", "/p/b", "/p/c"]);

        let desc = store
            .get("/p/", GetOptions::new().with_prefix().with_sort(SortOrder::Descend))
            .await
            .unwrap();
        let keys: Vec<_> = desc.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, ["/p/c", "/p/b", "/p/a"]);
    }

    #[tokio::test]
    async fn exact_get_ignores_siblings() {
        let store = MemoryStore::new();
        store.put("/p/a", b"1".to_vec(), None).await.unwrap();
        store.put("/p/ab", b"2".to_vec(), None).await.unwrap();

        let kvs = store.get("/p/a", GetOptions::new()).await.unwrap();
        assert_eq!(kvs.len(), 1);
        assert_eq!(kvs[0].value, b"1");
    }

    #[tokio::test(start_paused = true)]
    async fn expired_lease_removes_bound_keys() {
        let store = MemoryStore::new();
        let lease = store.grant_lease(Duration::from_secs(10)).await.unwrap();
        store.put("/leased", b"x".to_vec(), Some(lease)).await.unwrap();
        store.put("/plain", b"y".to_vec(), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        store.keep_alive_once(lease).await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.keys().await, ["/leased", "/plain"]);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.keys().await, ["/plain"]);
        assert!(matches!(
            store.keep_alive_once(lease).await,
            Err(StoreError::LeaseNotFound(id)) if id == lease
        ));
    }

    #[tokio::test]
    async fn put_with_unknown_lease_fails() {
        let store = MemoryStore::new();
        let err = store.put("/k", b"v".to_vec(), Some(42)).await.unwrap_err();
        assert!(matches!(err, StoreError::LeaseNotFound(42)));
        assert!(store.keys().await.is_empty());
    }

    #[tokio::test]
    async fn revoke_deletes_keys() {
        let store = MemoryStore::new();
        let lease = store.grant_lease(Duration::from_secs(30)).await.unwrap();
        store.put("/a", b"1".to_vec(), Some(lease)).await.unwrap();
        assert_eq!(store.lease_of("/a").await, Some(lease));

        assert!(store.revoke_lease(lease).await);
        assert!(!store.revoke_lease(lease).await);
        assert!(store.keys().await.is_empty());
        assert_eq!(store.lease_count().await, 0);
    }
}
