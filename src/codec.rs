//! JSON payload codec for stored service entries.

use tracing::warn;

use crate::service::Service;
use crate::Result;

/// Encode a service descriptor for storage.
pub fn encode(service: &Service) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(service)?)
}

/// Decode a stored entry.
///
/// Malformed payloads yield `None`; bulk readers skip them instead of failing
/// the whole scan.
pub fn decode(bytes: &[u8]) -> Option<Service> {
    match serde_json::from_slice::<Service>(bytes) {
        Ok(service) => Some(service),
        Err(e) => {
            warn!(error = %e, len = bytes.len(), "Failed to decode service entry");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{Endpoint, Node};

    #[test]
    fn encode_keeps_nested_fields() {
        let service = Service::new("greeter", "1.2.0")
            .with_metadata("region", "eu-west")
            .with_endpoint(Endpoint {
                name: "Greeter.Hello".into(),
                request: Some("HelloRequest".into()),
                response: Some("HelloReply".into()),
                ..Default::default()
            })
            .with_node(Node::new("n1", "10.0.0.1", 9000).with_metadata("zone", "a"));

        let decoded = decode(&encode(&service).unwrap()).expect("payload should decode");
        assert_eq!(decoded, service);
    }

    #[test]
    fn malformed_payload_is_skipped() {
        assert!(decode(b"not json").is_none());
        assert!(decode(b"").is_none());
        assert!(decode(br#"{"version":"1.0"}"#).is_none());
    }

    #[test]
    fn missing_optional_fields_default() {
        let decoded = decode(br#"{"name":"greeter"}"#).expect("name alone is enough");
        assert_eq!(decoded, Service::new("greeter", ""));
    }
}
