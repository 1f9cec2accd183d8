//! Key layout under the registry namespace.
//!
//! Every node of every service gets its own key:
//!
//! ```text
//! /micro-gxregistry/<service>/<node>
//! ```
//!
//! Path separators inside names are replaced with `-`, so `"a/b"` and `"a-b"`
//! land on the same segment.

/// Root of every key written by the registry.
pub const KEY_PREFIX: &str = "/micro-gxregistry";

const SEPARATOR: char = '/';

/// Replace path separators so a name fits in one key segment.
pub fn sanitize(segment: &str) -> String {
    segment.replace(SEPARATOR, "-")
}

/// Key holding a single node's entry.
pub fn node_path(service: &str, node_id: &str) -> String {
    join(&[&sanitize(service), &sanitize(node_id)])
}

/// Key prefix shared by all nodes of a service.
///
/// Append a trailing `/` before using it for a prefix read, otherwise
/// `"api"` would also match `"api-gateway"`.
pub fn service_path(service: &str) -> String {
    join(&[&sanitize(service)])
}

/// Prefix for a scan of a whole service, including the trailing separator.
pub(crate) fn service_scan_prefix(service: &str) -> String {
    format!("{}{SEPARATOR}", service_path(service))
}

/// Prefix for a scan of the whole namespace.
pub(crate) fn root_scan_prefix() -> String {
    format!("{KEY_PREFIX}{SEPARATOR}")
}

// Empty segments are dropped, like a path join would.
fn join(segments: &[&str]) -> String {
    let mut key = String::from(KEY_PREFIX);
    for segment in segments.iter().filter(|s| !s.is_empty()) {
        key.push(SEPARATOR);
        key.push_str(segment);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_path_joins_service_and_node() {
        assert_eq!(node_path("greeter", "node-1"), "/micro-gxregistry/greeter/node-1");
    }

    #[test]
    fn separators_are_replaced() {
        assert_eq!(
            node_path("acme/billing", "host/1"),
            "/micro-gxregistry/acme-billing/host-1"
        );
        assert_eq!(service_path("a/b/c"), "/micro-gxregistry/a-b-c");
    }

    #[test]
    fn service_path_is_prefix_of_node_path() {
        let service = service_scan_prefix("greeter");
        assert!(node_path("greeter", "n1").starts_with(&service));
        assert!(!node_path("greeter-v2", "n1").starts_with(&service));
    }

    #[test]
    fn empty_segments_are_dropped() {
        assert_eq!(service_path(""), KEY_PREFIX);
        assert_eq!(node_path("greeter", ""), "/micro-gxregistry/greeter");
    }

    #[test]
    fn sanitizing_can_collide() {
        // Known boundary: distinct raw names share a key after sanitizing.
        assert_eq!(node_path("a/b", "n"), node_path("a-b", "n"));
        assert_eq!(node_path("svc", "x/y"), node_path("svc", "x-y"));
    }

    #[test]
    fn keys_are_deterministic() {
        assert_eq!(node_path("s", "n"), node_path("s", "n"));
        assert_eq!(root_scan_prefix(), "/micro-gxregistry/");
    }
}
