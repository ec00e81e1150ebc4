//! Command implementations.
//!
//! Handlers return the text to print so they can be tested without a
//! terminal.

pub mod auth;
pub mod cart;
pub mod session;

use crave_storefront::CartStore;
use crave_storefront::config::StorefrontConfig;
use crave_storefront::storage::{FileStore, PersistenceGateway};

/// Shared state for one CLI invocation.
pub struct Context {
    pub config: StorefrontConfig,
    pub gateway: PersistenceGateway,
}

impl Context {
    /// Build a context backed by the configured data directory.
    pub fn new(config: StorefrontConfig) -> Self {
        let gateway = PersistenceGateway::new(FileStore::new(&config.data_dir));
        Self { config, gateway }
    }

    /// Build a context over an explicit gateway.
    #[cfg(test)]
    pub const fn with_gateway(config: StorefrontConfig, gateway: PersistenceGateway) -> Self {
        Self { config, gateway }
    }

    /// Create and hydrate a cart store, as a page load would.
    pub fn mount_store(&self) -> CartStore {
        CartStore::mount(self.config.business.clone(), self.gateway.clone())
    }
}

/// Write command output to stdout.
#[allow(clippy::print_stdout)]
pub fn emit(output: &str) {
    if !output.is_empty() {
        println!("{output}");
    }
}
