//! Coordination store seam.
//!
//! The registry talks to its store only through [`KvStore`]. Two
//! implementations ship with the crate:
//!
//! - [`MemoryStore`]: in-process keyspace with lease expiry
//! - `EtcdStore`: etcd v3 binding, behind the `etcd` feature

#[cfg(feature = "etcd")]
pub mod etcd;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

#[cfg(feature = "etcd")]
pub use etcd::EtcdStore;
pub use memory::MemoryStore;

/// Lease handle issued by the store.
pub type LeaseId = i64;

/// Errors returned by a [`KvStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The lease is unknown to the store, usually because it expired.
    #[error("Lease not found: {0}")]
    LeaseNotFound(LeaseId),

    /// The store could not be reached or refused the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Error raised by the store client, kept as its source.
    #[error("Store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StoreError {
    /// Create an unavailable error.
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Wrap a client error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// Key ordering for range reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending by key.
    Ascend,
    /// Descending by key.
    Descend,
}

/// Options for [`KvStore::get`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Treat the key as a prefix and return every key under it.
    pub prefix: bool,
    /// Sort results by key. `None` leaves the store's order.
    pub sort: Option<SortOrder>,
}

impl GetOptions {
    /// Exact-key read.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every key starting with the given key.
    pub fn with_prefix(mut self) -> Self {
        self.prefix = true;
        self
    }

    /// Sort results by key.
    pub fn with_sort(mut self, order: SortOrder) -> Self {
        self.sort = Some(order);
        self
    }
}

/// A stored entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// Full key.
    pub key: String,
    /// Raw value bytes.
    pub value: Vec<u8>,
}

/// Primitives the registry needs from a linearizable key-value store.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Read one key, or every key under a prefix.
    async fn get(&self, key: &str, options: GetOptions) -> Result<Vec<KeyValue>, StoreError>;

    /// Write a key, optionally bound to a lease.
    async fn put(&self, key: &str, value: Vec<u8>, lease: Option<LeaseId>)
        -> Result<(), StoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Grant a lease living `ttl` (whole seconds) unless renewed.
    async fn grant_lease(&self, ttl: Duration) -> Result<LeaseId, StoreError>;

    /// Renew a lease once.
    ///
    /// Returns [`StoreError::LeaseNotFound`] when the lease no longer exists.
    async fn keep_alive_once(&self, lease: LeaseId) -> Result<(), StoreError>;
}
