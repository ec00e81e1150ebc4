//! Domain models for the storefront.
//!
//! Records persisted between page loads. Cart lines themselves are defined in
//! `crave-core`; this module holds the envelopes and keys around them.

pub mod session;

pub use session::{PersistedCart, SESSION_TTL, StorageKey, StoredCartSession};
