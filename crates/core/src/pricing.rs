//! Pricing rules engine.
//!
//! Pure functions that derive line prices, subtotal, tax and total from a
//! [`BusinessConfig`], plus the eligibility predicates the checkout UI needs.
//! Every function is total: invalid numeric input yields `0.0` or `false`
//! rather than a panic. Amounts stay at full `f64` precision; round only when
//! formatting (see [`crate::format_money`]).

use serde::{Deserialize, Serialize};

use crate::config::BusinessConfig;
use crate::types::menu::is_valid_amount;
use crate::types::{CartLine, MenuItemRef, ModifierSelection};

/// Unit price plus modifier deltas, multiplied by quantity.
///
/// Returns `0.0` if the unit price or any modifier delta is negative or
/// non-finite.
#[must_use]
pub fn price_of_line(menu_item: &MenuItemRef, modifiers: &[ModifierSelection], quantity: u32) -> f64 {
    if !is_valid_amount(menu_item.price) || !modifiers.iter().all(|m| is_valid_amount(m.price)) {
        return 0.0;
    }

    let unit = menu_item.price + modifiers.iter().map(|m| m.price).sum::<f64>();
    let price = unit * f64::from(quantity);
    if price.is_finite() { price } else { 0.0 }
}

/// Sum of [`price_of_line`] over all lines.
#[must_use]
pub fn subtotal(lines: &[CartLine]) -> f64 {
    lines
        .iter()
        .map(|line| price_of_line(&line.menu_item, &line.modifiers, line.quantity))
        .sum()
}

/// Tax owed on a subtotal.
#[must_use]
pub fn tax(subtotal: f64, config: &BusinessConfig) -> f64 {
    if !is_valid_amount(subtotal) {
        return 0.0;
    }
    subtotal * config.tax_rate
}

/// Subtotal plus tax, delivery fee and tip.
///
/// A negative or non-finite tip is treated as no tip.
#[must_use]
pub fn total(subtotal: f64, config: &BusinessConfig, tip: f64) -> f64 {
    if !is_valid_amount(subtotal) {
        return 0.0;
    }
    let tip = if is_valid_amount(tip) { tip } else { 0.0 };
    subtotal + tax(subtotal, config) + config.delivery_fee + tip
}

/// Returns `true` if `1 <= quantity <= max_quantity_per_item`.
#[must_use]
pub fn is_valid_quantity(quantity: i64, config: &BusinessConfig) -> bool {
    quantity >= 1 && quantity <= i64::from(config.max_quantity_per_item)
}

/// Returns `true` if the pre-tax subtotal reaches the configured minimum.
#[must_use]
pub fn meets_minimum_order(subtotal: f64, config: &BusinessConfig) -> bool {
    subtotal >= config.minimum_order_amount
}

/// Returns `true` if a delivery address lies inside the delivery radius.
#[must_use]
pub fn is_within_delivery_radius(distance_miles: f64, config: &BusinessConfig) -> bool {
    is_valid_amount(distance_miles) && distance_miles <= config.delivery_radius_miles
}

/// Tip for a percentage (fraction) of the subtotal.
#[must_use]
pub fn tip_for_percentage(subtotal: f64, percentage: f64) -> f64 {
    if !is_valid_amount(subtotal) || !is_valid_amount(percentage) {
        return 0.0;
    }
    subtotal * percentage
}

/// A tip option offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TipSuggestion {
    /// Tip percentage as a fraction.
    pub percentage: f64,
    /// Tip amount for the current subtotal.
    pub amount: f64,
}

/// Tip options for a subtotal, one per configured percentage.
#[must_use]
pub fn suggested_tips(subtotal: f64, config: &BusinessConfig) -> Vec<TipSuggestion> {
    config
        .tip_percentages
        .iter()
        .map(|&percentage| TipSuggestion {
            percentage,
            amount: tip_for_percentage(subtotal, percentage),
        })
        .collect()
}
