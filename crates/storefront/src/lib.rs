//! Crave storefront library.
//!
//! The stateful side of the cart: configuration, durable storage, the cart
//! store, and the ordering-session bootstrap against the commerce backend.
//! Pure rules live in `crave-core`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod commerce;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod storage;
pub mod store;
pub mod telemetry;

pub use store::{CartStore, CartTotals};
