//! Cart state reducer.
//!
//! [`CartReducer::reduce`] maps `(state, action)` to the next state. It never
//! panics and never performs I/O; rejected actions leave `lines` untouched and
//! report the reason through [`CartState::error`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BusinessConfig;
use crate::pricing;
use crate::types::menu::is_valid_amount;
use crate::types::{CartLine, IdentityKey, LineId, MenuItemRef, ModifierSelection};

/// Recoverable validation failures surfaced to the cart UI.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartError {
    /// Merging an add into an existing line would exceed the per-line limit.
    #[error("You can order at most {max} of this item")]
    QuantityExceeded {
        /// Maximum quantity per line.
        max: u32,
    },
    /// The requested quantity is outside `1..=max`.
    #[error("Quantity {quantity} is not allowed (choose 1 to {max})")]
    InvalidQuantity {
        /// Requested quantity.
        quantity: i64,
        /// Maximum quantity per line.
        max: u32,
    },
    /// Adding another distinct line would exceed the cart limit.
    #[error("Your cart can hold at most {max} different items")]
    TooManyLines {
        /// Maximum number of lines.
        max: usize,
    },
    /// The item or one of its modifiers has a negative or non-finite price.
    #[error("This item is not available right now")]
    InvalidItem,
}

/// Cart state owned by the cart store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    /// Lines in display order.
    pub lines: Vec<CartLine>,
    /// Whether the cart drawer is expanded. Never persisted.
    pub is_open: bool,
    /// Last validation failure, cleared by the next successful mutation.
    pub error: Option<CartError>,
    /// True until the persisted cart has been loaded.
    pub loading: bool,
}

impl CartState {
    /// Find a line by ID.
    #[must_use]
    pub fn line(&self, id: LineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == id)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Returns `true` if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Every transition the cart supports.
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    /// Add units of an item, merging with an existing line of the same identity.
    AddItem {
        menu_item: MenuItemRef,
        modifiers: Vec<ModifierSelection>,
        quantity: u32,
        notes: Option<String>,
    },
    /// Set a line's quantity. Zero or below removes the line.
    UpdateQuantity { line_id: LineId, quantity: i64 },
    /// Remove a line. Unknown IDs are ignored.
    RemoveItem { line_id: LineId },
    /// Replace a line's notes.
    UpdateNotes {
        line_id: LineId,
        notes: Option<String>,
    },
    /// Remove every line.
    ClearCart,
    /// Expand or collapse the cart drawer.
    SetOpen(bool),
    /// Replace all lines with previously persisted ones.
    LoadCart(Vec<CartLine>),
    /// Clear the current error message.
    DismissError,
}

impl CartAction {
    /// `AddItem` without notes.
    #[must_use]
    pub fn add(menu_item: MenuItemRef, modifiers: Vec<ModifierSelection>, quantity: u32) -> Self {
        Self::AddItem {
            menu_item,
            modifiers,
            quantity,
            notes: None,
        }
    }

    /// Returns `true` for actions that can change `lines`.
    #[must_use]
    pub const fn touches_lines(&self) -> bool {
        !matches!(self, Self::SetOpen(_) | Self::DismissError)
    }

    /// Short name used in logs and breadcrumbs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddItem { .. } => "add_item",
            Self::UpdateQuantity { .. } => "update_quantity",
            Self::RemoveItem { .. } => "remove_item",
            Self::UpdateNotes { .. } => "update_notes",
            Self::ClearCart => "clear_cart",
            Self::SetOpen(_) => "set_open",
            Self::LoadCart(_) => "load_cart",
            Self::DismissError => "dismiss_error",
        }
    }
}

/// Applies [`CartAction`]s under a [`BusinessConfig`].
#[derive(Debug, Clone, Default)]
pub struct CartReducer {
    config: BusinessConfig,
}

impl CartReducer {
    /// Create a reducer for the given business rules.
    #[must_use]
    pub const fn new(config: BusinessConfig) -> Self {
        Self { config }
    }

    /// The business rules this reducer enforces.
    #[must_use]
    pub const fn config(&self) -> &BusinessConfig {
        &self.config
    }

    /// Compute the next state.
    #[must_use]
    pub fn reduce(&self, mut state: CartState, action: CartAction) -> CartState {
        match action {
            CartAction::AddItem {
                menu_item,
                modifiers,
                quantity,
                notes,
            } => self.add_item(state, menu_item, modifiers, quantity, notes),
            CartAction::UpdateQuantity { line_id, quantity } => {
                self.update_quantity(state, line_id, quantity)
            }
            CartAction::RemoveItem { line_id } => {
                state.lines.retain(|line| line.id != line_id);
                state
            }
            CartAction::UpdateNotes { line_id, notes } => {
                if let Some(line) = state.lines.iter_mut().find(|line| line.id == line_id) {
                    line.notes = notes.filter(|n| !n.trim().is_empty());
                }
                state
            }
            CartAction::ClearCart => {
                state.lines.clear();
                state.error = None;
                state
            }
            CartAction::SetOpen(open) => {
                state.is_open = open;
                state
            }
            CartAction::LoadCart(lines) => {
                state.lines = self.sanitize(lines);
                state.loading = false;
                state.error = None;
                state
            }
            CartAction::DismissError => {
                state.error = None;
                state
            }
        }
    }

    fn add_item(
        &self,
        mut state: CartState,
        menu_item: MenuItemRef,
        modifiers: Vec<ModifierSelection>,
        quantity: u32,
        notes: Option<String>,
    ) -> CartState {
        let max = self.config.max_quantity_per_item;

        if !is_valid_amount(menu_item.price) || !modifiers.iter().all(|m| is_valid_amount(m.price))
        {
            state.error = Some(CartError::InvalidItem);
            return state;
        }

        if !pricing::is_valid_quantity(i64::from(quantity), &self.config) {
            state.error = Some(CartError::InvalidQuantity {
                quantity: i64::from(quantity),
                max,
            });
            return state;
        }

        let key = IdentityKey::new(&menu_item, &modifiers);
        let notes = notes.filter(|n| !n.trim().is_empty());

        if let Some(existing) = state.lines.iter_mut().find(|line| line.identity_key() == key) {
            let merged = u64::from(existing.quantity) + u64::from(quantity);
            let Some(merged) = u32::try_from(merged).ok().filter(|&q| q <= max) else {
                state.error = Some(CartError::QuantityExceeded { max });
                return state;
            };

            existing.quantity = merged;
            if notes.is_some() {
                existing.notes = notes;
            }
            existing.recompute_subtotal();
        } else {
            if state.lines.len() >= self.config.max_total_lines {
                state.error = Some(CartError::TooManyLines {
                    max: self.config.max_total_lines,
                });
                return state;
            }
            state
                .lines
                .push(CartLine::new(menu_item, modifiers, quantity, notes));
        }

        state.error = None;
        state
    }

    fn update_quantity(&self, mut state: CartState, line_id: LineId, quantity: i64) -> CartState {
        if quantity <= 0 {
            state.lines.retain(|line| line.id != line_id);
            return state;
        }

        if !pricing::is_valid_quantity(quantity, &self.config) {
            state.error = Some(CartError::InvalidQuantity {
                quantity,
                max: self.config.max_quantity_per_item,
            });
            return state;
        }

        if let Some(line) = state.lines.iter_mut().find(|line| line.id == line_id)
            && let Ok(quantity) = u32::try_from(quantity)
        {
            line.quantity = quantity;
            line.recompute_subtotal();
            state.error = None;
        }
        state
    }

    /// Restore the cart invariants on lines that came from outside the reducer.
    ///
    /// Drops zero-quantity lines and lines with a negative or non-finite price,
    /// clamps quantities to the per-line maximum,
    /// folds lines with the same identity into the first one, enforces the
    /// line limit and recomputes every subtotal.
    fn sanitize(&self, lines: Vec<CartLine>) -> Vec<CartLine> {
        let max = self.config.max_quantity_per_item;
        let mut out: Vec<CartLine> = Vec::with_capacity(lines.len());
        let mut positions: HashMap<IdentityKey, usize> = HashMap::new();

        for mut line in lines {
            if line.quantity == 0 {
                continue;
            }

            if !is_valid_amount(line.menu_item.price)
                || !line.modifiers.iter().all(|m| is_valid_amount(m.price))
            {
                continue;
            }

            let key = line.identity_key();
            if let Some(existing) = positions.get(&key).and_then(|&i| out.get_mut(i)) {
                existing.quantity = existing.quantity.saturating_add(line.quantity).min(max);
                existing.recompute_subtotal();
                continue;
            }

            if out.len() >= self.config.max_total_lines {
                continue;
            }

            line.quantity = line.quantity.min(max);
            line.recompute_subtotal();
            positions.insert(key, out.len());
            out.push(line);
        }

        out
    }
}
