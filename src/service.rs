//! Service descriptors published to the registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A logical service: one name, one version, any number of nodes.
///
/// Metadata maps are ordered so that two descriptors built with different
/// insertion orders encode, and therefore fingerprint, identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Unique service name, e.g. `"greeter"` or `"acme/billing"`.
    pub name: String,
    /// Distinguishes variants deployed side by side.
    #[serde(default)]
    pub version: String,
    /// Opaque service-level metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// RPC endpoints exposed by the service. Opaque to the registry.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Instances serving this service.
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Service {
    /// Create a service with a name and version and nothing else.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Append an endpoint.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Append a node.
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Copy of this descriptor whose node list holds exactly `node`.
    ///
    /// This is the shape written under each node key.
    pub fn for_node(&self, node: &Node) -> Self {
        Self {
            name: self.name.clone(),
            version: self.version.clone(),
            metadata: self.metadata.clone(),
            endpoints: self.endpoints.clone(),
            nodes: vec![node.clone()],
        }
    }

    /// Copy of this descriptor with no nodes.
    pub(crate) fn without_nodes(&self) -> Self {
        Self {
            name: self.name.clone(),
            version: self.version.clone(),
            metadata: self.metadata.clone(),
            endpoints: self.endpoints.clone(),
            nodes: Vec::new(),
        }
    }

    /// Name-only stub, as returned by `list_services`.
    pub(crate) fn stub(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// One instance of a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique within the service; becomes the last key segment.
    pub id: String,
    /// Host name or IP address.
    #[serde(default)]
    pub address: String,
    /// Listening port.
    #[serde(default)]
    pub port: u16,
    /// Opaque node-level metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Node {
    /// Create a node.
    pub fn new(id: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            port,
            metadata: BTreeMap::new(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// `address:port`, bracketing IPv6 literals.
    pub fn addr(&self) -> String {
        if self.address.contains(':') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

/// An RPC endpoint exposed by a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Method name, e.g. `"Greeter.Hello"`.
    pub name: String,
    /// Request type name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    /// Response type name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Opaque endpoint metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Endpoint {
    /// Create an endpoint with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
