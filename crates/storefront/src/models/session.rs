//! Session-related types.
//!
//! Records written to durable storage for the cart and the ordering session,
//! and the keys they are stored under.

use std::time::Duration;

use crave_core::{CartId, CartLine, LocationId};
use serde::{Deserialize, Serialize};

/// How long a location's cart binding stays valid.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Storage keys.
///
/// Every logical record has its own namespaced key, so two records never
/// collide regardless of location IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Serialized cart lines.
    CartLines,
    /// Remote cart binding for one location.
    Session(LocationId),
    /// Bearer token for the commerce API.
    AuthToken,
}

impl StorageKey {
    const PREFIX: &'static str = "crave";

    /// The string key used by the storage backend.
    #[must_use]
    pub fn as_key(&self) -> String {
        match self {
            Self::CartLines => format!("{}:cart", Self::PREFIX),
            Self::Session(location) => format!("{}:session:{location}", Self::PREFIX),
            Self::AuthToken => format!("{}:auth_token", Self::PREFIX),
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_key())
    }
}

/// Binding between a location and the remote cart used at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCartSession {
    /// Remote cart ID issued by the commerce API.
    pub cart_id: CartId,
    /// Location the cart belongs to.
    pub location_id: LocationId,
    /// When the binding was last refreshed (Unix epoch milliseconds).
    pub timestamp_ms: i64,
}

impl StoredCartSession {
    /// Returns `true` once the record is 24 hours old or older, or if its
    /// timestamp lies in the future.
    #[must_use]
    pub fn is_expired(&self, now_ms: i64) -> bool {
        !is_fresh(self.timestamp_ms, now_ms, SESSION_TTL)
    }
}

/// Envelope for the persisted cart lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCart {
    /// Schema version of `lines`.
    pub version: u32,
    /// When the cart was written (Unix epoch milliseconds).
    pub saved_at_ms: i64,
    /// Cart lines in display order.
    pub lines: Vec<CartLine>,
}

impl PersistedCart {
    /// Current schema version. Bump when `CartLine` changes incompatibly.
    pub const VERSION: u32 = 1;

    /// Wrap lines for writing.
    #[must_use]
    pub fn new(lines: Vec<CartLine>, saved_at_ms: i64) -> Self {
        Self {
            version: Self::VERSION,
            saved_at_ms,
            lines,
        }
    }

    /// Returns `true` if this record can be hydrated at `now_ms`.
    #[must_use]
    pub fn is_usable(&self, now_ms: i64, max_age: Duration) -> bool {
        self.version == Self::VERSION && is_fresh(self.saved_at_ms, now_ms, max_age)
    }
}

/// A timestamp is fresh if it is not ahead of `now_ms` and younger than `max_age`.
fn is_fresh(timestamp_ms: i64, now_ms: i64, max_age: Duration) -> bool {
    let ttl_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
    timestamp_ms <= now_ms && now_ms.saturating_sub(timestamp_ms) < ttl_ms
}
