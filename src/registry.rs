//! Service registration against a coordination store.
//!
//! Each registry instance owns its own caches (last fingerprint and lease
//! per service name). Clones share them; separately constructed registries
//! do not.

use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::codec;
use crate::fingerprint::{fingerprint, ChangeDetector};
use crate::keys::node_path;
use crate::lease::{with_deadline, LeaseManager};
use crate::options::{RegisterOptions, RegistryOptions};
use crate::service::Service;
use crate::store::KvStore;
use crate::{Error, Result};

/// Publishes services into a [`KvStore`] and reads them back.
///
/// # Register
///
/// ```ignore
/// let registry = ServiceRegistry::new(MemoryStore::new(), RegistryOptions::default());
/// let service = Service::new("greeter", "1.0").with_node(Node::new("n1", "10.0.0.1", 9000));
/// registry
///     .register(&service, RegisterOptions::new().ttl(Duration::from_secs(30)))
///     .await?;
/// ```
///
/// # Discover
///
/// ```ignore
/// for version in registry.get_service("greeter").await? {
///     println!("{} {} nodes", version.version, version.nodes.len());
/// }
/// ```
///
/// Store writes for the same service are not serialized by the registry:
/// two concurrent `register` calls may interleave their puts, and the store's
/// last write per key wins.
pub struct ServiceRegistry<S: KvStore> {
    pub(crate) store: Arc<S>,
    pub(crate) options: RegistryOptions,
    leases: Arc<LeaseManager>,
    changes: Arc<ChangeDetector>,
}

impl<S: KvStore> Clone for ServiceRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            options: self.options.clone(),
            leases: Arc::clone(&self.leases),
            changes: Arc::clone(&self.changes),
        }
    }
}

impl<S: KvStore> ServiceRegistry<S> {
    /// Create a registry over `store`.
    pub fn new(store: S, options: RegistryOptions) -> Self {
        Self::with_shared_store(Arc::new(store), options)
    }

    /// Create a registry over a store shared with other owners.
    ///
    /// The caches are still private to this registry.
    pub fn with_shared_store(store: Arc<S>, options: RegistryOptions) -> Self {
        Self {
            store,
            options: options.normalized(),
            leases: Arc::new(LeaseManager::new()),
            changes: Arc::new(ChangeDetector::new()),
        }
    }

    /// Current configuration.
    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Lease currently tracked for `service`.
    pub async fn lease(&self, service: &str) -> Option<crate::store::LeaseId> {
        self.leases.get(service).await
    }

    /// Publish every node of `service`, one key per node.
    ///
    /// Returns without writing when the service is unchanged since the last
    /// successful registration and its lease (if any) is still alive. A
    /// lease the store has forgotten forces a full rewrite.
    ///
    /// The first failed put aborts the call. Nodes written before it stay in
    /// the store and the cached fingerprint is dropped, so the next call
    /// rewrites everything.
    pub async fn register(&self, service: &Service, options: RegisterOptions) -> Result<()> {
        require_nodes(service)?;
        let deadline = self.deadline();
        let timeout = self.options.timeout;
        let name = service.name.as_str();

        let status = self
            .leases
            .ensure_live(self.store.as_ref(), name, deadline, timeout)
            .await?;

        let fingerprint = fingerprint(service)?;
        if self
            .changes
            .should_skip(name, fingerprint, status.is_expired())
            .await
        {
            debug!(service = name, "Service unchanged, skipping registration");
            return Ok(());
        }
        // Until every put lands, the store may not hold what the cache says.
        self.changes.forget(name).await;

        let lease = self
            .leases
            .grant(self.store.as_ref(), options.ttl, deadline, timeout)
            .await?;

        for node in &service.nodes {
            let key = node_path(name, &node.id);
            let value = codec::encode(&service.for_node(node))?;
            with_deadline(deadline, timeout, self.store.put(&key, value, lease)).await?;
            debug!(service = name, node = %node.id, key = %key, lease_id = ?lease, "Wrote node entry");
        }

        self.changes.record(name, fingerprint).await;
        match lease {
            Some(id) => self.leases.track(name, id).await,
            None => self.leases.forget(name).await,
        }

        info!(
            service = name,
            version = %service.version,
            nodes = service.nodes.len(),
            lease_id = ?lease,
            "Registered service"
        );
        Ok(())
    }

    /// Remove every node of `service` from the store.
    ///
    /// Cached state is dropped before any delete is issued. The first failed
    /// delete aborts the call; earlier deletions are not undone.
    pub async fn deregister(&self, service: &Service) -> Result<()> {
        require_nodes(service)?;
        let deadline = self.deadline();
        let timeout = self.options.timeout;
        let name = service.name.as_str();

        self.changes.forget(name).await;
        self.leases.forget(name).await;

        for node in &service.nodes {
            let key = node_path(name, &node.id);
            with_deadline(deadline, timeout, self.store.delete(&key)).await?;
            debug!(service = name, node = %node.id, key = %key, "Deleted node entry");
        }

        info!(service = name, nodes = service.nodes.len(), "Deregistered service");
        Ok(())
    }

    /// Deadline for an operation starting now.
    pub(crate) fn deadline(&self) -> Instant {
        Instant::now() + self.options.timeout
    }
}

#[cfg(feature = "etcd")]
impl ServiceRegistry<crate::store::EtcdStore> {
    /// Connect to the etcd cluster named in `options.addrs`.
    pub async fn connect(options: RegistryOptions) -> Result<Self> {
        let options = options.normalized();
        let store = crate::store::EtcdStore::connect(&options.addrs, options.timeout)
            .await
            .map_err(|e| Error::connection(format!("etcd {:?}: {e}", options.addrs)))?;
        Ok(Self::new(store, options))
    }
}

impl<S: KvStore> fmt::Display for ServiceRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Registry")
    }
}

impl<S: KvStore> fmt::Debug for ServiceRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn require_nodes(service: &Service) -> Result<()> {
    if service.nodes.is_empty() {
        return Err(Error::invalid_argument(format!(
            "service {:?} requires at least one node",
            service.name
        )));
    }
    Ok(())
}
