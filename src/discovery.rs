//! Read paths: per-service lookup and service enumeration.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, trace};

use crate::codec;
use crate::keys::{root_scan_prefix, service_scan_prefix};
use crate::lease::with_deadline;
use crate::options::WatchOptions;
use crate::registry::ServiceRegistry;
use crate::service::Service;
use crate::store::{GetOptions, KeyValue, KvStore, SortOrder};
use crate::watch::Watcher;
use crate::{Error, Result};

impl<S: KvStore> ServiceRegistry<S> {
    /// Every version of `name` currently in the store.
    ///
    /// Entries are read newest key first and grouped by version; each
    /// returned service carries the nodes of all its entries. Entries that
    /// fail to decode are skipped. Fails with [`Error::NotFound`] when the
    /// store holds no entry at all for `name`.
    pub async fn get_service(&self, name: &str) -> Result<Vec<Service>> {
        let prefix = service_scan_prefix(name);
        let kvs = with_deadline(
            self.deadline(),
            self.options.timeout,
            self.store.get(
                &prefix,
                GetOptions::new()
                    .with_prefix()
                    .with_sort(SortOrder::Descend),
            ),
        )
        .await?;

        if kvs.is_empty() {
            return Err(Error::NotFound(name.to_string()));
        }

        let services = merge_versions(&kvs);
        debug!(
            service = name,
            entries = kvs.len(),
            versions = services.len(),
            "Resolved service"
        );
        Ok(services)
    }

    /// Distinct service names in the store, as name-only descriptors.
    ///
    /// An empty store yields an empty list.
    pub async fn list_services(&self) -> Result<Vec<Service>> {
        let kvs = with_deadline(
            self.deadline(),
            self.options.timeout,
            self.store.get(
                &root_scan_prefix(),
                GetOptions::new()
                    .with_prefix()
                    .with_sort(SortOrder::Descend),
            ),
        )
        .await?;

        let names = distinct_names(&kvs);
        debug!(entries = kvs.len(), services = names.len(), "Listed services");
        Ok(names.into_iter().map(Service::stub).collect())
    }

    /// Subscribe to registry changes.
    ///
    /// Not implemented by this registry: always returns
    /// [`Error::Unsupported`].
    pub async fn watch(&self, options: WatchOptions) -> Result<Watcher> {
        debug!(service = ?options.service, "Watch requested but not supported");
        Err(Error::Unsupported("watch"))
    }
}

/// Group entries by version, merging their nodes in scan order.
fn merge_versions(kvs: &[KeyValue]) -> Vec<Service> {
    let mut services: Vec<Service> = Vec::new();
    let mut by_version: HashMap<String, usize> = HashMap::new();

    for kv in kvs {
        let Some(entry) = codec::decode(&kv.value) else {
            trace!(key = %kv.key, "Skipping undecodable entry");
            continue;
        };
        let idx = *by_version.entry(entry.version.clone()).or_insert_with(|| {
            services.push(entry.without_nodes());
            services.len() - 1
        });
        services[idx].nodes.extend(entry.nodes);
    }
    services
}

fn distinct_names(kvs: &[KeyValue]) -> BTreeSet<String> {
    kvs.iter()
        .filter_map(|kv| codec::decode(&kv.value))
        .map(|service| service.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Node;

    fn kv(key: &str, service: &Service) -> KeyValue {
        KeyValue {
            key: key.to_string(),
            value: codec::encode(service).unwrap(),
        }
    }

    #[test]
    fn merge_groups_nodes_by_version() {
        let v1 = Service::new("svc", "v1").with_metadata("gen", "1");
        let v2 = Service::new("svc", "v2");
        let kvs = vec![
            kv("/micro-gxregistry/svc/c", &v2.clone().with_node(Node::new("c", "h3", 3))),
            kv("/micro-gxregistry/svc/b", &v1.clone().with_node(Node::new("b", "h2", 2))),
            KeyValue {
                key: "/micro-gxregistry/svc/garbage".into(),
                value: b"{".to_vec(),
            },
            kv("/micro-gxregistry/svc/a", &v1.clone().with_node(Node::new("a", "h1", 1))),
        ];

        let services = merge_versions(&kvs);
        assert_eq!(services.len(), 2);

        let v2_merged = services.iter().find(|s| s.version == "v2").unwrap();
        assert_eq!(v2_merged.nodes, vec![Node::new("c", "h3", 3)]);

        let v1_merged = services.iter().find(|s| s.version == "v1").unwrap();
        assert_eq!(v1_merged.metadata.get("gen").map(String::as_str), Some("1"));
        let ids: Vec<_> = v1_merged.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn only_garbage_merges_to_nothing() {
        let kvs = vec![KeyValue {
            key: "/micro-gxregistry/svc/x".into(),
            value: b"nope".to_vec(),
        }];
        assert!(merge_versions(&kvs).is_empty());
    }

    #[test]
    fn distinct_names_dedupes_and_skips_garbage() {
        let a = Service::new("alpha", "1").with_node(Node::new("n", "h", 1));
        let b = Service::new("beta", "1").with_node(Node::new("n", "h", 1));
        let kvs = vec![
            kv("/micro-gxregistry/beta/n", &b),
            kv("/micro-gxregistry/alpha/n2", &a),
            kv("/micro-gxregistry/alpha/n", &a),
            KeyValue {
                key: "/micro-gxregistry/zzz/n".into(),
                value: Vec::new(),
            },
        ];
        let names: Vec<_> = distinct_names(&kvs).into_iter().collect();
        assert_eq!(names, ["alpha", "beta"]);
    }
}
