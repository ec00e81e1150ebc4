//! Crave Core - Cart types, pricing rules and the cart reducer.
//!
//! This crate holds everything about the cart that can be expressed without
//! I/O:
//! - [`types`] - Newtype IDs, menu items, modifiers, cart lines, currencies
//! - [`config`] - Business rules ([`BusinessConfig`])
//! - [`pricing`] - Pure pricing and eligibility functions
//! - [`reducer`] - The cart state machine ([`CartReducer`])
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no storage, no
//! HTTP clients, no logging. The storefront crate wraps the reducer in a
//! stateful store that persists lines and talks to the commerce API.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod pricing;
pub mod reducer;
pub mod types;

pub use config::BusinessConfig;
pub use reducer::{CartAction, CartError, CartReducer, CartState};
pub use types::*;
