//! Integration tests for Crave.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p crave-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_persistence` - Cart store over a real data directory
//! - `session_bootstrap` - Ordering sessions against a mock commerce API
//!
//! Tests share the fixtures below: a temporary data directory, a manual
//! clock, and small menu helpers.

use std::time::Duration;

use crave_core::{BusinessConfig, MenuItemRef, ModifierSelection};
use crave_storefront::CartStore;
use crave_storefront::storage::{FileStore, ManualClock, PersistenceGateway};
use tempfile::TempDir;

/// Start of every test clock (2023-11-14T22:13:20Z).
pub const T0: i64 = 1_700_000_000_000;

/// A data directory and clock shared by every store a test mounts.
pub struct TestContext {
    dir: TempDir,
    pub clock: ManualClock,
}

impl TestContext {
    /// Create a context with an empty data directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
            clock: ManualClock::new(T0),
        }
    }

    /// A fresh gateway over the shared directory, like a new process would open.
    #[must_use]
    pub fn gateway(&self) -> PersistenceGateway {
        PersistenceGateway::with_clock(FileStore::new(self.dir.path()), self.clock.clone())
    }

    /// Mount a hydrated store, simulating a page load.
    #[must_use]
    pub fn mount(&self, config: BusinessConfig) -> CartStore {
        CartStore::mount(config, self.gateway())
    }

    /// Advance the shared clock.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A menu item with no category.
#[must_use]
pub fn item(id: &str, price: f64) -> MenuItemRef {
    MenuItemRef::new(id, id, price, "")
}

/// A modifier whose display name is its ID.
#[must_use]
pub fn modifier(id: &str, price: f64) -> ModifierSelection {
    ModifierSelection::new(id, id, price)
}
