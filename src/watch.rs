//! Change notifications for registered services.
//!
//! Only the shape is defined here. [`ServiceRegistry::watch`] currently
//! returns [`Error::Unsupported`], and callers should treat that as "no
//! change feed available".
//!
//! [`ServiceRegistry::watch`]: crate::ServiceRegistry::watch
//! [`Error::Unsupported`]: crate::Error::Unsupported

use std::fmt;
use std::pin::Pin;

use futures_util::Stream;

use crate::service::Service;
use crate::Result;

/// Kind of change observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    /// A node entry appeared.
    Create,
    /// A node entry was rewritten.
    Update,
    /// A node entry was deleted or its lease expired.
    Delete,
}

impl fmt::Display for WatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// One change, carrying the affected service narrowed to its node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// What happened.
    pub action: WatchAction,
    /// The service entry involved.
    pub service: Service,
}

/// Lazy stream of changes. Dropping it cancels the watch.
pub type Watcher = Pin<Box<dyn Stream<Item = Result<WatchEvent>> + Send>>;
