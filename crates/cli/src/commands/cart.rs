//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! crave cart add burger --name Burger --price 10 --modifier cheese:Cheese:1
//! crave cart update <line-id> 3
//! crave cart remove <line-id>
//! crave cart show --tip 2.50
//! crave cart clear
//! ```

use std::fmt::Write as _;

use clap::Args;
use crave_core::pricing;
use crave_core::{LineId, MenuItemRef, ModifierSelection, format_money};
use crave_storefront::CartStore;
use crave_storefront::error::{AppError, Result};

use super::Context;

/// Arguments for `cart add`.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// Menu item ID
    pub item_id: String,

    /// Display name
    #[arg(long)]
    pub name: String,

    /// Base unit price
    #[arg(long)]
    pub price: f64,

    /// Menu category
    #[arg(long, default_value = "")]
    pub category: String,

    /// Units to add
    #[arg(short, long, default_value_t = 1)]
    pub quantity: u32,

    /// Modifier as `id:name:price`, repeatable
    #[arg(long = "modifier", value_parser = parse_modifier)]
    pub modifiers: Vec<ModifierSelection>,

    /// Special instructions
    #[arg(long)]
    pub notes: Option<String>,
}

/// Parse a modifier written as `id:name:price`.
///
/// # Errors
///
/// Returns a message if a part is missing or the price is not a number.
pub fn parse_modifier(raw: &str) -> std::result::Result<ModifierSelection, String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(id), Some(name), Some(price)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected id:name:price, got '{raw}'"));
    };
    if id.is_empty() {
        return Err("modifier id must not be empty".to_string());
    }
    let price: f64 = price
        .trim()
        .parse()
        .map_err(|e| format!("invalid modifier price '{price}': {e}"))?;
    Ok(ModifierSelection::new(id, name, price))
}

/// Print lines and totals.
pub fn show(ctx: &Context, tip: Option<f64>) -> String {
    render(&ctx.mount_store(), tip)
}

/// Add an item to the cart.
///
/// # Errors
///
/// Returns `AppError::Cart` if the cart rejects the item.
pub fn add(ctx: &Context, args: AddArgs) -> Result<String> {
    let mut store = ctx.mount_store();
    let item = MenuItemRef::new(args.item_id, args.name, args.price, args.category);
    store.add_item_with_notes(item, args.modifiers, args.quantity, args.notes);
    ensure_accepted(&store)?;
    Ok(render(&store, None))
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown line and `AppError::Cart` if
/// the quantity is rejected.
pub fn update(ctx: &Context, line_id: LineId, quantity: i64) -> Result<String> {
    let mut store = ctx.mount_store();
    find_line(&store, line_id)?;
    store.update_quantity(line_id, quantity);
    ensure_accepted(&store)?;
    Ok(render(&store, None))
}

/// Remove a line.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown line.
pub fn remove(ctx: &Context, line_id: LineId) -> Result<String> {
    let mut store = ctx.mount_store();
    find_line(&store, line_id)?;
    store.remove_item(line_id);
    Ok(render(&store, None))
}

/// Remove every line.
pub fn clear(ctx: &Context) -> String {
    let mut store = ctx.mount_store();
    store.clear();
    tracing::info!("Cart cleared");
    render(&store, None)
}

fn find_line(store: &CartStore, line_id: LineId) -> Result<()> {
    store
        .state()
        .line(line_id)
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("cart line {line_id}")))
}

fn ensure_accepted(store: &CartStore) -> Result<()> {
    store.error().map_or(Ok(()), |e| Err(AppError::Cart(e.clone())))
}

/// Render the cart as plain text.
pub fn render(store: &CartStore, tip: Option<f64>) -> String {
    let config = store.config();
    let money = |amount: f64| format_money(amount, config.currency);

    if store.lines().is_empty() {
        return "Cart is empty".to_string();
    }

    let totals = store.totals_with_tip(tip.unwrap_or(0.0));
    let mut out = String::new();

    let _ = writeln!(out, "Cart ({} items)", totals.total_items);
    for line in store.lines() {
        let mut description = format!("{} x {}", line.quantity, line.menu_item.name);
        if !line.modifiers.is_empty() {
            let names: Vec<&str> = line.modifiers.iter().map(|m| m.name.as_str()).collect();
            let _ = write!(description, " (+ {})", names.join(", "));
        }
        let _ = writeln!(out, "  {}  {description}  {}", line.id, money(line.subtotal));
        if let Some(notes) = &line.notes {
            let _ = writeln!(out, "      note: {notes}");
        }
    }

    let _ = writeln!(out, "Subtotal  {}", money(totals.subtotal));
    let _ = writeln!(out, "Tax       {}", money(totals.tax));
    let _ = writeln!(out, "Delivery  {}", money(totals.delivery_fee));
    if totals.tip > 0.0 {
        let _ = writeln!(out, "Tip       {}", money(totals.tip));
    }
    let _ = write!(out, "Total     {}", money(totals.total));

    if !totals.meets_minimum_order {
        let _ = write!(
            out,
            "\nMinimum order of {} not reached",
            money(config.minimum_order_amount)
        );
    }

    let suggestions: Vec<String> = pricing::suggested_tips(totals.subtotal, config)
        .iter()
        .map(|t| format!("{:.0}% {}", t.percentage * 100.0, money(t.amount)))
        .collect();
    if tip.is_none() && !suggestions.is_empty() {
        let _ = write!(out, "\nSuggested tips: {}", suggestions.join(" | "));
    }

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use crave_core::CartError;
    use crave_storefront::config::StorefrontConfig;
    use crave_storefront::storage::{MemoryStore, PersistenceGateway};

    use super::*;

    fn context(pairs: &'static [(&'static str, &'static str)]) -> Context {
        let config = StorefrontConfig::from_lookup(&|key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        })
        .unwrap();
        Context::with_gateway(config, PersistenceGateway::new(MemoryStore::new()))
    }

    fn burger(quantity: u32) -> AddArgs {
        AddArgs {
            item_id: "burger".to_string(),
            name: "Burger".to_string(),
            price: 10.0,
            category: "Mains".to_string(),
            quantity,
            modifiers: vec![ModifierSelection::new("cheese", "Cheese", 1.0)],
            notes: None,
        }
    }

    #[test]
    fn test_parse_modifier() {
        let modifier = parse_modifier("cheese:Extra Cheese:1.50").unwrap();
        assert_eq!(modifier.id.as_str(), "cheese");
        assert_eq!(modifier.name, "Extra Cheese");
        assert!((modifier.price - 1.5).abs() < f64::EPSILON);

        assert!(parse_modifier("cheese:Cheese").is_err());
        assert!(parse_modifier("cheese:Cheese:free").is_err());
        assert!(parse_modifier(":Cheese:1").is_err());
    }

    #[test]
    fn test_add_persists_between_invocations() {
        let ctx = context(&[]);
        add(&ctx, burger(1)).unwrap();
        let output = add(&ctx, burger(1)).unwrap();

        assert!(output.contains("Cart (2 items)"));
        assert!(output.contains("2 x Burger (+ Cheese)"));
        assert!(output.contains("$22.00"));
        assert_eq!(ctx.mount_store().lines().len(), 1);
    }

    #[test]
    fn test_add_rejected_over_limit() {
        let ctx = context(&[("CRAVE_MAX_QUANTITY_PER_ITEM", "3")]);
        add(&ctx, burger(2)).unwrap();

        let err = add(&ctx, burger(2)).unwrap_err();
        assert!(matches!(
            err,
            AppError::Cart(CartError::QuantityExceeded { max: 3 })
        ));
        assert_eq!(ctx.mount_store().lines()[0].quantity, 2);
    }

    #[test]
    fn test_update_and_remove() {
        let ctx = context(&[]);
        add(&ctx, burger(1)).unwrap();
        let line_id = ctx.mount_store().lines()[0].id;

        let output = update(&ctx, line_id, 4).unwrap();
        assert!(output.contains("4 x Burger"));

        let output = update(&ctx, line_id, 0).unwrap();
        assert_eq!(output, "Cart is empty");

        assert!(matches!(
            remove(&ctx, line_id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_unknown_line() {
        let ctx = context(&[]);
        assert!(matches!(
            update(&ctx, LineId::generate(), 2),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_show_with_tip_and_minimum() {
        let ctx = context(&[
            ("CRAVE_TAX_RATE", "0.1"),
            ("CRAVE_DELIVERY_FEE", "2"),
            ("CRAVE_MINIMUM_ORDER", "50"),
        ]);
        add(&ctx, burger(1)).unwrap();

        let output = show(&ctx, Some(3.0));
        assert!(output.contains("Subtotal  $11.00"));
        assert!(output.contains("Tax       $1.10"));
        assert!(output.contains("Tip       $3.00"));
        assert!(output.contains("Total     $17.10"));
        assert!(output.contains("Minimum order of $50.00 not reached"));
        assert!(!output.contains("Suggested tips"));

        let output = show(&ctx, None);
        assert!(output.contains("Suggested tips: 15% $1.65"));
    }

    #[test]
    fn test_clear() {
        let ctx = context(&[]);
        add(&ctx, burger(1)).unwrap();
        assert_eq!(clear(&ctx), "Cart is empty");
        assert!(ctx.mount_store().lines().is_empty());
    }
}
