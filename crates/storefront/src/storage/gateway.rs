//! Typed persistence on top of a [`KeyValueStore`].

use std::fmt;
use std::sync::Arc;

use crave_core::{CartId, CartLine, LocationId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{Clock, KeyValueStore, StorageError, SystemClock};
use crate::models::{PersistedCart, StorageKey, StoredCartSession};

/// Reads and writes cart records, never propagating storage failures.
///
/// Cheaply cloneable; clones share the backend and clock.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceGateway").finish_non_exhaustive()
    }
}

impl PersistenceGateway {
    /// Create a gateway over `store` using the system clock.
    #[must_use]
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self::with_clock(store, SystemClock)
    }

    /// Create a gateway with an explicit clock.
    #[must_use]
    pub fn with_clock(store: impl KeyValueStore + 'static, clock: impl Clock + 'static) -> Self {
        Self {
            store: Arc::new(store),
            clock: Arc::new(clock),
        }
    }

    /// Current time according to the gateway's clock.
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    // =========================================================================
    // Generic access
    // =========================================================================

    /// Read and decode a record, reporting failures.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the value does not decode.
    pub fn try_get_json<T: DeserializeOwned>(&self, key: &StorageKey) -> Result<Option<T>, StorageError> {
        self.store
            .get(&key.as_key())?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(StorageError::from)
    }

    /// Read and decode a record. Any failure is logged and reported as absent.
    #[must_use]
    pub fn get_json<T: DeserializeOwned>(&self, key: &StorageKey) -> Option<T> {
        self.try_get_json(key).unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "Failed to read stored record");
            None
        })
    }

    /// Encode and write a record. Failures are logged, never returned.
    pub fn set_json<T: Serialize>(&self, key: &StorageKey, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(StorageError::from)
            .and_then(|raw| self.store.set(&key.as_key(), &raw));

        if let Err(e) = result {
            warn!(key = %key, error = %e, "Failed to write stored record");
        }
    }

    /// Delete a record. Failures are logged, never returned.
    pub fn remove(&self, key: &StorageKey) {
        if let Err(e) = self.store.remove(&key.as_key()) {
            warn!(key = %key, error = %e, "Failed to delete stored record");
        }
    }

    // =========================================================================
    // Cart lines
    // =========================================================================

    /// Read the persisted cart, if any.
    #[must_use]
    pub fn load_cart(&self) -> Option<PersistedCart> {
        self.get_json(&StorageKey::CartLines)
    }

    /// Persist cart lines stamped with the current time.
    pub fn save_cart(&self, lines: &[CartLine]) {
        let record = PersistedCart::new(lines.to_vec(), self.now_ms());
        self.set_json(&StorageKey::CartLines, &record);
        debug!(lines = lines.len(), "Cart persisted");
    }

    /// Delete the persisted cart.
    pub fn clear_cart(&self) {
        self.remove(&StorageKey::CartLines);
    }

    // =========================================================================
    // Ordering sessions
    // =========================================================================

    /// Read the cart binding for a location.
    ///
    /// Records that are 24 hours old or belong to another location are
    /// deleted and reported as absent.
    #[must_use]
    pub fn load_session(&self, location: &LocationId) -> Option<StoredCartSession> {
        let key = StorageKey::Session(location.clone());
        let record: StoredCartSession = self.get_json(&key)?;

        if record.is_expired(self.now_ms()) || &record.location_id != location {
            debug!(location = %location, "Discarding expired cart session");
            self.remove(&key);
            return None;
        }

        Some(record)
    }

    /// Bind a location to a remote cart, starting a fresh 24 hour window.
    pub fn save_session(&self, location: &LocationId, cart_id: &CartId) -> StoredCartSession {
        let record = StoredCartSession {
            cart_id: cart_id.clone(),
            location_id: location.clone(),
            timestamp_ms: self.now_ms(),
        };
        self.set_json(&StorageKey::Session(location.clone()), &record);
        record
    }

    /// Forget a location's cart binding.
    pub fn remove_session(&self, location: &LocationId) {
        self.remove(&StorageKey::Session(location.clone()));
    }

    // =========================================================================
    // Auth token
    // =========================================================================

    /// Read the stored auth token.
    #[must_use]
    pub fn auth_token(&self) -> Option<String> {
        self.get_json(&StorageKey::AuthToken)
    }

    /// Store an auth token.
    pub fn set_auth_token(&self, token: &str) {
        self.set_json(&StorageKey::AuthToken, &token);
    }

    /// Delete the stored auth token.
    pub fn clear_auth_token(&self) {
        self.remove(&StorageKey::AuthToken);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use crave_core::MenuItemRef;

    use super::*;
    use crate::storage::{ManualClock, MemoryStore};

    const T0: i64 = 1_700_000_000_000;

    /// A backend where every operation fails.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
    }

    fn gateway() -> (PersistenceGateway, MemoryStore, ManualClock) {
        let store = MemoryStore::new();
        let clock = ManualClock::new(T0);
        (
            PersistenceGateway::with_clock(store.clone(), clock.clone()),
            store,
            clock,
        )
    }

    #[test]
    fn test_session_readable_until_expiry() {
        let (gateway, _, clock) = gateway();
        let location = LocationId::new("downtown");
        gateway.save_session(&location, &CartId::new("cart-1"));

        clock.advance(Duration::from_secs(23 * 3600 + 59 * 60));
        let record = gateway.load_session(&location).unwrap();
        assert_eq!(record.cart_id, CartId::new("cart-1"));
        assert_eq!(record.timestamp_ms, T0);

        clock.advance(Duration::from_secs(2 * 60));
        assert!(gateway.load_session(&location).is_none());
    }

    #[test]
    fn test_expired_session_is_purged() {
        let (gateway, store, clock) = gateway();
        let location = LocationId::new("downtown");
        gateway.save_session(&location, &CartId::new("cart-1"));
        assert_eq!(store.len(), 1);

        clock.advance(Duration::from_secs(25 * 3600));
        assert!(gateway.load_session(&location).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_future_dated_session_is_purged() {
        let (gateway, store, _) = gateway();
        let location = LocationId::new("downtown");
        let record = StoredCartSession {
            cart_id: CartId::new("cart-1"),
            location_id: location.clone(),
            timestamp_ms: T0 + 3_600_000,
        };
        gateway.set_json(&StorageKey::Session(location.clone()), &record);
        assert_eq!(store.len(), 1);

        assert!(gateway.load_session(&location).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_saving_session_refreshes_window() {
        let (gateway, _, clock) = gateway();
        let location = LocationId::new("downtown");
        gateway.save_session(&location, &CartId::new("cart-1"));

        clock.advance(Duration::from_secs(20 * 3600));
        gateway.save_session(&location, &CartId::new("cart-1"));
        clock.advance(Duration::from_secs(20 * 3600));

        assert!(gateway.load_session(&location).is_some());
    }

    #[test]
    fn test_sessions_are_per_location() {
        let (gateway, _, _) = gateway();
        gateway.save_session(&LocationId::new("a"), &CartId::new("cart-a"));
        gateway.save_session(&LocationId::new("b"), &CartId::new("cart-b"));

        assert_eq!(
            gateway.load_session(&LocationId::new("a")).unwrap().cart_id,
            CartId::new("cart-a")
        );
        assert_eq!(
            gateway.load_session(&LocationId::new("b")).unwrap().cart_id,
            CartId::new("cart-b")
        );
        assert!(gateway.load_session(&LocationId::new("c")).is_none());
    }

    #[test]
    fn test_corrupt_record_reads_as_absent() {
        let (gateway, store, _) = gateway();
        store.set(&StorageKey::CartLines.as_key(), "{not json").unwrap();

        assert!(gateway.load_cart().is_none());
        assert!(matches!(
            gateway.try_get_json::<PersistedCart>(&StorageKey::CartLines),
            Err(StorageError::Serialize(_))
        ));
    }

    #[test]
    fn test_cart_roundtrip_stamps_time() {
        let (gateway, _, _) = gateway();
        let line = CartLine::new(MenuItemRef::new("burger", "Burger", 10.0, ""), vec![], 2, None);
        gateway.save_cart(std::slice::from_ref(&line));

        let record = gateway.load_cart().unwrap();
        assert_eq!(record.version, PersistedCart::VERSION);
        assert_eq!(record.saved_at_ms, T0);
        assert_eq!(record.lines, vec![line]);

        gateway.clear_cart();
        assert!(gateway.load_cart().is_none());
    }

    #[test]
    fn test_auth_token_roundtrip() {
        let (gateway, _, _) = gateway();
        assert!(gateway.auth_token().is_none());
        gateway.set_auth_token("tok_123");
        assert_eq!(gateway.auth_token().as_deref(), Some("tok_123"));
        gateway.clear_auth_token();
        assert!(gateway.auth_token().is_none());
    }

    #[test]
    fn test_broken_backend_never_propagates() {
        let gateway = PersistenceGateway::with_clock(BrokenStore, ManualClock::new(T0));
        let location = LocationId::new("downtown");

        gateway.save_cart(&[]);
        gateway.clear_cart();
        gateway.save_session(&location, &CartId::new("cart-1"));
        gateway.set_auth_token("tok");

        assert!(gateway.load_cart().is_none());
        assert!(gateway.load_session(&location).is_none());
        assert!(gateway.auth_token().is_none());
        assert!(gateway.try_get_json::<String>(&StorageKey::AuthToken).is_err());
    }
}
