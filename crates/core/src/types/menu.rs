//! Menu items and modifier selections referenced by cart lines.

use serde::{Deserialize, Serialize};

use super::id::{MenuItemId, ModifierId};

/// A purchasable menu item as referenced by a cart line.
///
/// Captured by value when the item is added, so later menu edits do not
/// change lines already in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemRef {
    /// Menu item ID.
    pub id: MenuItemId,
    /// Display name.
    pub name: String,
    /// Unit price before modifiers.
    pub price: f64,
    /// Menu category (e.g., "Burgers").
    #[serde(default)]
    pub category: String,
}

impl MenuItemRef {
    /// Create a menu item reference.
    #[must_use]
    pub fn new(
        id: impl Into<MenuItemId>,
        name: impl Into<String>,
        price: f64,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            category: category.into(),
        }
    }
}

/// A chosen customization on a cart line (e.g., "extra cheese").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierSelection {
    /// Modifier option ID.
    pub id: ModifierId,
    /// Display name.
    pub name: String,
    /// Price delta added to the unit price. Never negative.
    #[serde(default)]
    pub price: f64,
}

impl ModifierSelection {
    /// Create a modifier selection.
    #[must_use]
    pub fn new(id: impl Into<ModifierId>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
        }
    }
}

/// Returns `true` if an amount is usable as a price or price delta.
pub(crate) fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount >= 0.0
}
