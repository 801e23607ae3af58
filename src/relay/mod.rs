//! Bundle relay port
//!
//! The relay executes every transaction of a bundle in order, or none.

mod jito;

pub use jito::{JitoRelay, UNKNOWN_BUNDLE_ID};

use crate::constants::NO_LEADER_MARKER;
use crate::errors::{BundlerError, BundlerResult, RejectionKind};
use async_trait::async_trait;

/// Relay-side view of a submitted bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayBundleStatus {
    Pending,
    Landed { slot: Option<u64> },
    Failed,
    /// Unknown to the relay (expired or never accepted)
    Invalid,
}

#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Submit base64-encoded transactions as one bundle; returns the bundle id
    async fn send_bundle(&self, encoded_transactions: Vec<String>) -> BundlerResult<String>;

    /// `None` while the relay has nothing to report yet
    async fn bundle_status(&self, bundle_id: &str) -> BundlerResult<Option<RelayBundleStatus>>;
}

/// Maps a relay error message to `RelayRejected`, singling out the
/// "no connected leader" case.
pub fn classify_rejection(message: &str) -> BundlerError {
    let kind = if message.contains(NO_LEADER_MARKER) {
        RejectionKind::NoLeader
    } else {
        RejectionKind::Generic
    };
    BundlerError::RelayRejected {
        kind,
        message: message.to_string(),
    }
}
