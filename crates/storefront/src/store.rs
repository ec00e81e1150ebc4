//! Cart store.
//!
//! The stateful shell around [`CartReducer`]: it owns the current
//! [`CartState`], recomputes derived totals whenever lines change, and mirrors
//! lines into the [`PersistenceGateway`].
//!
//! # Lifecycle
//!
//! ```rust,ignore
//! let mut store = CartStore::mount(config, gateway); // create + hydrate
//! store.add_item(item, vec![], 2);                    // use
//! let final_state = store.dispose();                  // dispose
//! ```
//!
//! The store is an ordinary value passed to whoever renders the cart; there
//! is no global instance.

use crave_core::pricing;
use crave_core::{
    BusinessConfig, CartAction, CartError, CartLine, CartReducer, CartState, LineId, MenuItemRef,
    ModifierSelection,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::add_breadcrumb;
use crate::models::{PersistedCart, StorageKey};
use crate::storage::{PersistenceGateway, StorageError};

/// Aggregates derived from the current lines.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CartTotals {
    /// Sum of quantities.
    pub total_items: u64,
    /// Sum of line prices.
    pub subtotal: f64,
    /// Tax on the subtotal.
    pub tax: f64,
    /// Flat delivery fee.
    pub delivery_fee: f64,
    /// Tip included in `total`.
    pub tip: f64,
    /// Subtotal + tax + delivery fee + tip.
    pub total: f64,
    /// Whether the cart has no lines.
    pub is_empty: bool,
    /// Whether the subtotal reaches the minimum order amount.
    pub meets_minimum_order: bool,
}

impl CartTotals {
    /// Compute totals for `lines` with an optional tip.
    #[must_use]
    pub fn compute(lines: &[CartLine], config: &BusinessConfig, tip: f64) -> Self {
        let subtotal = pricing::subtotal(lines);
        let tip = if tip.is_finite() && tip > 0.0 { tip } else { 0.0 };
        Self {
            total_items: lines.iter().map(|l| u64::from(l.quantity)).sum(),
            subtotal,
            tax: pricing::tax(subtotal, config),
            delivery_fee: config.delivery_fee,
            tip,
            total: pricing::total(subtotal, config, tip),
            is_empty: lines.is_empty(),
            meets_minimum_order: pricing::meets_minimum_order(subtotal, config),
        }
    }
}

/// Holds cart state and keeps it in sync with durable storage.
#[derive(Debug)]
pub struct CartStore {
    reducer: CartReducer,
    gateway: PersistenceGateway,
    state: CartState,
    totals: CartTotals,
    hydrated: bool,
}

impl CartStore {
    /// Create a store with an empty, not yet hydrated cart.
    #[must_use]
    pub fn new(config: BusinessConfig, gateway: PersistenceGateway) -> Self {
        let totals = CartTotals::compute(&[], &config, 0.0);
        Self {
            reducer: CartReducer::new(config),
            gateway,
            state: CartState {
                loading: true,
                ..CartState::default()
            },
            totals,
            hydrated: false,
        }
    }

    /// Create a store and hydrate it from storage.
    #[must_use]
    pub fn mount(config: BusinessConfig, gateway: PersistenceGateway) -> Self {
        let mut store = Self::new(config, gateway);
        store.hydrate();
        store
    }

    /// Restore lines from storage. Runs at most once per store.
    ///
    /// Missing, unreadable, outdated or expired records leave the cart empty;
    /// all but missing ones are deleted. Returns `false` if the store was
    /// already hydrated.
    pub fn hydrate(&mut self) -> bool {
        if self.hydrated {
            return false;
        }
        self.hydrated = true;

        let now = self.gateway.now_ms();
        match self.gateway.try_get_json::<PersistedCart>(&StorageKey::CartLines) {
            Ok(Some(record)) if record.is_usable(now, self.config().session_timeout) => {
                if record.lines.is_empty() {
                    debug!("Discarding empty persisted cart");
                    self.gateway.clear_cart();
                    self.state.loading = false;
                } else {
                    let count = record.lines.len();
                    // Loading never rewrites the record; `saved_at_ms` only moves on a real change.
                    let prev = std::mem::take(&mut self.state);
                    self.state = self.reducer.reduce(prev, CartAction::LoadCart(record.lines));
                    self.recompute();
                    info!(lines = count, "Cart hydrated from storage");
                }
            }
            Ok(Some(record)) => {
                info!(
                    version = record.version,
                    saved_at_ms = record.saved_at_ms,
                    "Discarding stale persisted cart"
                );
                self.gateway.clear_cart();
                self.state.loading = false;
            }
            Ok(None) => {
                self.state.loading = false;
            }
            Err(StorageError::Serialize(e)) => {
                warn!(error = %e, "Discarding unreadable persisted cart");
                self.gateway.clear_cart();
                self.state.loading = false;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted cart");
                self.state.loading = false;
            }
        }

        true
    }

    /// Apply an action and run persistence side effects.
    pub fn dispatch(&mut self, action: CartAction) -> &CartState {
        let name = action.name();
        let touches_lines = action.touches_lines();
        let before = touches_lines.then(|| self.state.lines.clone());

        let prev = std::mem::take(&mut self.state);
        self.state = self.reducer.reduce(prev, action);

        if let Some(before) = before
            && before != self.state.lines
        {
            self.recompute();
            self.persist();
        }

        debug!(
            action = name,
            lines = self.state.lines.len(),
            error = ?self.state.error,
            "Cart action applied"
        );
        match self.state.error.as_ref().map(ToString::to_string) {
            Some(error) => add_breadcrumb("cart", name, Some(&[("error", error.as_str())])),
            None => add_breadcrumb("cart", name, None),
        }

        &self.state
    }

    fn recompute(&mut self) {
        self.totals = CartTotals::compute(&self.state.lines, self.reducer.config(), 0.0);
    }

    fn persist(&self) {
        if self.state.lines.is_empty() {
            self.gateway.clear_cart();
        } else {
            self.gateway.save_cart(&self.state.lines);
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Add units of an item.
    pub fn add_item(
        &mut self,
        menu_item: MenuItemRef,
        modifiers: Vec<ModifierSelection>,
        quantity: u32,
    ) -> &CartState {
        self.dispatch(CartAction::add(menu_item, modifiers, quantity))
    }

    /// Add units of an item with notes.
    pub fn add_item_with_notes(
        &mut self,
        menu_item: MenuItemRef,
        modifiers: Vec<ModifierSelection>,
        quantity: u32,
        notes: Option<String>,
    ) -> &CartState {
        self.dispatch(CartAction::AddItem {
            menu_item,
            modifiers,
            quantity,
            notes,
        })
    }

    /// Set a line's quantity; zero or below removes it.
    pub fn update_quantity(&mut self, line_id: LineId, quantity: i64) -> &CartState {
        self.dispatch(CartAction::UpdateQuantity { line_id, quantity })
    }

    /// Remove a line.
    pub fn remove_item(&mut self, line_id: LineId) -> &CartState {
        self.dispatch(CartAction::RemoveItem { line_id })
    }

    /// Replace a line's notes.
    pub fn update_notes(&mut self, line_id: LineId, notes: Option<String>) -> &CartState {
        self.dispatch(CartAction::UpdateNotes { line_id, notes })
    }

    /// Remove every line.
    pub fn clear(&mut self) -> &CartState {
        self.dispatch(CartAction::ClearCart)
    }

    /// Expand or collapse the cart drawer.
    pub fn set_open(&mut self, open: bool) -> &CartState {
        self.dispatch(CartAction::SetOpen(open))
    }

    /// Clear the current error message.
    pub fn dismiss_error(&mut self) -> &CartState {
        self.dispatch(CartAction::DismissError)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// Current lines in display order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.state.lines
    }

    /// Last validation error.
    #[must_use]
    pub const fn error(&self) -> Option<&CartError> {
        self.state.error.as_ref()
    }

    /// Whether the cart drawer is expanded.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.state.is_open
    }

    /// Whether hydration has not finished yet.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.state.loading
    }

    /// Totals without a tip.
    #[must_use]
    pub const fn totals(&self) -> &CartTotals {
        &self.totals
    }

    /// Totals including a tip chosen at checkout.
    #[must_use]
    pub fn totals_with_tip(&self, tip: f64) -> CartTotals {
        CartTotals::compute(&self.state.lines, self.reducer.config(), tip)
    }

    /// Business rules in effect.
    #[must_use]
    pub const fn config(&self) -> &BusinessConfig {
        self.reducer.config()
    }

    /// Tear the store down, returning the final state.
    #[must_use]
    pub fn dispose(self) -> CartState {
        debug!(lines = self.state.lines.len(), "Cart store disposed");
        self.state
    }
}
