//! Business rules configuration.
//!
//! Resolved once from deployment settings and shared by the pricing engine,
//! the reducer and the cart store. Loading from the environment lives in the
//! storefront crate; this crate only defines the shape and defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::CurrencyCode;

/// Pricing and cart limits for a storefront deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessConfig {
    /// Sales tax rate as a fraction (e.g., `0.08875`).
    pub tax_rate: f64,
    /// Tip percentages offered at checkout, as fractions.
    pub tip_percentages: Vec<f64>,
    /// Flat delivery fee added to every order.
    pub delivery_fee: f64,
    /// Minimum pre-tax subtotal required to check out.
    pub minimum_order_amount: f64,
    /// Currency used for display.
    pub currency: CurrencyCode,
    /// Locale tag used for display (e.g., `en-US`).
    pub locale: String,
    /// Maximum quantity on a single line.
    pub max_quantity_per_item: u32,
    /// Maximum number of distinct lines in a cart.
    pub max_total_lines: usize,
    /// Maximum age of a persisted cart before it is discarded on load.
    pub session_timeout: Duration,
    /// Maximum delivery distance in miles.
    pub delivery_radius_miles: f64,
}

impl BusinessConfig {
    /// Default tax rate (New York City combined sales tax).
    pub const DEFAULT_TAX_RATE: f64 = 0.088_75;
    /// Default flat delivery fee.
    pub const DEFAULT_DELIVERY_FEE: f64 = 2.99;
    /// Default minimum order amount.
    pub const DEFAULT_MINIMUM_ORDER: f64 = 15.0;
    /// Default maximum quantity per line.
    pub const DEFAULT_MAX_QUANTITY: u32 = 99;
    /// Default maximum number of lines.
    pub const DEFAULT_MAX_LINES: usize = 50;
    /// Default maximum age of a persisted cart.
    pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
    /// Default delivery radius in miles.
    pub const DEFAULT_DELIVERY_RADIUS_MILES: f64 = 5.0;
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            tax_rate: Self::DEFAULT_TAX_RATE,
            tip_percentages: vec![0.15, 0.18, 0.20],
            delivery_fee: Self::DEFAULT_DELIVERY_FEE,
            minimum_order_amount: Self::DEFAULT_MINIMUM_ORDER,
            currency: CurrencyCode::USD,
            locale: "en-US".to_string(),
            max_quantity_per_item: Self::DEFAULT_MAX_QUANTITY,
            max_total_lines: Self::DEFAULT_MAX_LINES,
            session_timeout: Self::DEFAULT_SESSION_TIMEOUT,
            delivery_radius_miles: Self::DEFAULT_DELIVERY_RADIUS_MILES,
        }
    }
}
