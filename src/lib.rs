//! Lease-backed service registration and discovery over etcd v3.
//!
//! A process publishes its nodes under a service name, one key per node,
//! optionally bound to a lease so the store drops them if the process stops
//! re-registering. Other processes resolve a service to its nodes, grouped by
//! version, or list every known service.

#![deny(missing_docs)]

pub mod codec;
mod discovery;
pub mod error;
pub mod fingerprint;
pub mod keys;
pub mod lease;
pub mod options;
pub mod registry;
pub mod service;
pub mod store;
pub mod watch;

// Re-export key types
pub use error::{Error, Result};
pub use options::{RegisterOptions, RegistryOptions, WatchOptions};
pub use registry::ServiceRegistry;
pub use service::{Endpoint, Node, Service};
#[cfg(feature = "etcd")]
pub use store::EtcdStore;
pub use store::{KvStore, LeaseId, MemoryStore, StoreError};
pub use watch::{WatchAction, WatchEvent, Watcher};
