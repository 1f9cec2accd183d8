//! Registry, registration and watch options.

use std::time::Duration;

/// Store address used when none is configured.
pub const DEFAULT_ADDR: &str = "127.0.0.1:2379";

/// Deadline applied to each registry operation when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Registry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Store cluster endpoints.
    pub addrs: Vec<String>,
    /// Deadline for each registry operation. Default: 5s.
    pub timeout: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            addrs: vec![DEFAULT_ADDR.to_string()],
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RegistryOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the store endpoints. Empty entries are dropped; an empty result
    /// keeps the default address.
    pub fn addrs<I, S>(mut self, addrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let addrs: Vec<String> = addrs
            .into_iter()
            .map(Into::into)
            .filter(|a| !a.is_empty())
            .collect();
        if !addrs.is_empty() {
            self.addrs = addrs;
        }
        self
    }

    /// Set the per-operation deadline. Zero keeps the default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            timeout
        };
        self
    }

    /// Fill in defaults for fields set directly on the struct.
    pub(crate) fn normalized(mut self) -> Self {
        self.addrs.retain(|a| !a.is_empty());
        if self.addrs.is_empty() {
            self.addrs = vec![DEFAULT_ADDR.to_string()];
        }
        if self.timeout.is_zero() {
            self.timeout = DEFAULT_TIMEOUT;
        }
        self
    }
}

/// Options for a single `register` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Lease duration for the written entries. Zero writes unleased entries
    /// that stay until deregistered.
    pub ttl: Duration,
}

impl RegisterOptions {
    /// Unleased registration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind entries to a lease of this duration.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Options for `watch`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Only report changes for this service. `None` watches every service.
    pub service: Option<String>,
    /// How long to wait for the next event before giving up.
    pub timeout: Option<Duration>,
}

impl WatchOptions {
    /// Watch everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one service.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Set the per-event wait.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_options_default() {
        let opts = RegistryOptions::default();
        assert_eq!(opts.addrs, vec!["127.0.0.1:2379".to_string()]);
        assert_eq!(opts.timeout, Duration::from_secs(5));
    }

    #[test]
    fn empty_addrs_are_filtered() {
        let opts = RegistryOptions::new().addrs(["", "10.0.0.1:2379", ""]);
        assert_eq!(opts.addrs, vec!["10.0.0.1:2379".to_string()]);

        let opts = RegistryOptions::new().addrs([""]);
        assert_eq!(opts.addrs, vec![DEFAULT_ADDR.to_string()]);
    }

    #[test]
    fn zero_timeout_falls_back() {
        let opts = RegistryOptions::new().timeout(Duration::ZERO);
        assert_eq!(opts.timeout, DEFAULT_TIMEOUT);

        let opts = RegistryOptions {
            addrs: vec![String::new()],
            timeout: Duration::ZERO,
        }
        .normalized();
        assert_eq!(opts, RegistryOptions::default());
    }

    #[test]
    fn register_options_default_to_no_lease() {
        assert!(RegisterOptions::default().ttl.is_zero());
        assert_eq!(
            RegisterOptions::new().ttl(Duration::from_secs(10)).ttl,
            Duration::from_secs(10)
        );
    }
}
