//! Cart lines and their merge identity.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::id::{LineId, MenuItemId, ModifierId};
use super::menu::{MenuItemRef, ModifierSelection};
use crate::pricing;

/// The key two add requests are compared on to decide whether they merge.
///
/// Modifier order is irrelevant: `[A, B]` and `[B, A]` produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    menu_item: MenuItemId,
    modifiers: BTreeSet<ModifierId>,
}

impl IdentityKey {
    /// Build the key for a menu item with the given modifier selections.
    #[must_use]
    pub fn new(menu_item: &MenuItemRef, modifiers: &[ModifierSelection]) -> Self {
        Self {
            menu_item: menu_item.id.clone(),
            modifiers: modifiers.iter().map(|m| m.id.clone()).collect(),
        }
    }

    /// The menu item part of the key.
    #[must_use]
    pub const fn menu_item(&self) -> &MenuItemId {
        &self.menu_item
    }

    /// The canonical modifier set.
    #[must_use]
    pub const fn modifiers(&self) -> &BTreeSet<ModifierId> {
        &self.modifiers
    }
}

/// One row in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Line ID, stable across merges.
    pub id: LineId,
    /// The item being purchased.
    pub menu_item: MenuItemRef,
    /// Number of units, at least 1.
    pub quantity: u32,
    /// Chosen modifiers in selection order.
    #[serde(default)]
    pub modifiers: Vec<ModifierSelection>,
    /// Derived line price. Recomputed on every change and on load.
    #[serde(default)]
    pub subtotal: f64,
    /// Free-text instructions (e.g., "no onions").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CartLine {
    /// Create a new line with a freshly generated ID.
    #[must_use]
    pub fn new(
        menu_item: MenuItemRef,
        modifiers: Vec<ModifierSelection>,
        quantity: u32,
        notes: Option<String>,
    ) -> Self {
        let mut line = Self {
            id: LineId::generate(),
            menu_item,
            quantity,
            modifiers,
            subtotal: 0.0,
            notes,
        };
        line.recompute_subtotal();
        line
    }

    /// The merge identity of this line.
    #[must_use]
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(&self.menu_item, &self.modifiers)
    }

    /// Unit price including modifier deltas.
    #[must_use]
    pub fn unit_price(&self) -> f64 {
        pricing::price_of_line(&self.menu_item, &self.modifiers, 1)
    }

    /// Recompute the derived `subtotal` from price, modifiers and quantity.
    pub fn recompute_subtotal(&mut self) {
        self.subtotal = pricing::price_of_line(&self.menu_item, &self.modifiers, self.quantity);
    }

    /// Structural equality ignoring the derived subtotal.
    #[must_use]
    pub fn same_contents(&self, other: &Self) -> bool {
        self.id == other.id
            && self.menu_item == other.menu_item
            && self.quantity == other.quantity
            && self.modifiers == other.modifiers
            && self.notes == other.notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burger() -> MenuItemRef {
        MenuItemRef::new("burger", "Burger", 10.0, "Mains")
    }

    #[test]
    fn test_identity_key_ignores_modifier_order() {
        let a = ModifierSelection::new("cheese", "Cheese", 1.0);
        let b = ModifierSelection::new("bacon", "Bacon", 2.0);

        let left = IdentityKey::new(&burger(), &[a.clone(), b.clone()]);
        let right = IdentityKey::new(&burger(), &[b, a]);
        assert_eq!(left, right);
    }

    #[test]
    fn test_identity_key_distinguishes_modifier_sets() {
        let a = ModifierSelection::new("cheese", "Cheese", 1.0);
        assert_ne!(IdentityKey::new(&burger(), &[a]), IdentityKey::new(&burger(), &[]));
    }

    #[test]
    fn test_new_line_computes_subtotal() {
        let line = CartLine::new(
            burger(),
            vec![ModifierSelection::new("cheese", "Cheese", 1.5)],
            2,
            None,
        );
        assert!((line.subtotal - 23.0).abs() < 1e-9);
        assert!((line.unit_price() - 11.5).abs() < 1e-9);
    }
}
