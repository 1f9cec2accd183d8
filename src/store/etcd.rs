//! etcd v3 binding for [`KvStore`].

use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, DeleteOptions, PutOptions, SortTarget};
use tracing::{debug, trace};

use super::{GetOptions, KeyValue, KvStore, LeaseId, SortOrder, StoreError};

/// [`KvStore`] backed by an etcd cluster.
///
/// `etcd_client::Client` is a cheap handle over shared channels; every call
/// works on its own clone.
#[derive(Clone)]
pub struct EtcdStore {
    client: Client,
}

impl EtcdStore {
    /// Wrap an already connected client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect to the given endpoints.
    pub async fn connect(endpoints: &[String], timeout: Duration) -> Result<Self, StoreError> {
        let options = ConnectOptions::new()
            .with_connect_timeout(timeout)
            .with_timeout(timeout);
        let client = Client::connect(endpoints, Some(options)).await?;
        debug!(endpoints = ?endpoints, "Connected to etcd");
        Ok(Self { client })
    }

    /// Access the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl From<etcd_client::Error> for StoreError {
    fn from(err: etcd_client::Error) -> Self {
        StoreError::backend(err)
    }
}

/// etcd reports a missing lease as gRPC `NotFound`.
fn lease_error(lease: LeaseId, err: etcd_client::Error) -> StoreError {
    match &err {
        etcd_client::Error::GRpcStatus(status) if status.code() == tonic::Code::NotFound => {
            StoreError::LeaseNotFound(lease)
        }
        _ => StoreError::backend(err),
    }
}

#[async_trait]
impl KvStore for EtcdStore {
    async fn get(&self, key: &str, options: GetOptions) -> Result<Vec<KeyValue>, StoreError> {
        let mut get_options = etcd_client::GetOptions::new();
        if options.prefix {
            get_options = get_options.with_prefix();
        }
        if let Some(order) = options.sort {
            let order = match order {
                SortOrder::Ascend => etcd_client::SortOrder::Ascend,
                SortOrder::Descend => etcd_client::SortOrder::Descend,
            };
            get_options = get_options.with_sort(SortTarget::Key, order);
        }

        let response = self.client.clone().get(key, Some(get_options)).await?;
        let kvs = response
            .kvs()
            .iter()
            .map(|kv| KeyValue {
                key: String::from_utf8_lossy(kv.key()).into_owned(),
                value: kv.value().to_vec(),
            })
            .collect();
        Ok(kvs)
    }

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        lease: Option<LeaseId>,
    ) -> Result<(), StoreError> {
        let options = lease.map(|id| PutOptions::new().with_lease(id));
        self.client
            .clone()
            .put(key, value, options)
            .await
            .map_err(|e| match lease {
                Some(id) => lease_error(id, e),
                None => StoreError::backend(e),
            })?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .clone()
            .delete(key, Some(DeleteOptions::new()))
            .await?;
        Ok(())
    }

    async fn grant_lease(&self, ttl: Duration) -> Result<LeaseId, StoreError> {
        let ttl_secs = ttl.as_secs().max(1) as i64;
        let response = self.client.clone().lease_grant(ttl_secs, None).await?;
        trace!(lease_id = response.id(), ttl = response.ttl(), "Lease granted");
        Ok(response.id())
    }

    async fn keep_alive_once(&self, lease: LeaseId) -> Result<(), StoreError> {
        let (mut keeper, mut stream) = self
            .client
            .clone()
            .lease_keep_alive(lease)
            .await
            .map_err(|e| lease_error(lease, e))?;
        keeper.keep_alive().await.map_err(|e| lease_error(lease, e))?;

        match stream.message().await.map_err(|e| lease_error(lease, e))? {
            Some(response) if response.ttl() > 0 => {
                trace!(lease_id = lease, ttl = response.ttl(), "Keep-alive OK");
                Ok(())
            }
            Some(_) => Err(StoreError::LeaseNotFound(lease)),
            None => Err(StoreError::unavailable("keep-alive stream closed")),
        }
    }
}
