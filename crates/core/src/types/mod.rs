//! Core types for Crave.
//!
//! This module provides type-safe wrappers for cart domain concepts.

pub mod cart;
pub mod id;
pub mod menu;
pub mod price;

pub use cart::{CartLine, IdentityKey};
pub use id::*;
pub use menu::{MenuItemRef, ModifierSelection};
pub use price::{CurrencyCode, format_money, round_to_cents};
