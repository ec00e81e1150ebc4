//! Ordering-session commands.
//!
//! # Usage
//!
//! ```bash
//! crave session start downtown --param table=12
//! crave session show downtown
//! crave session forget downtown
//! ```
//!
//! # Environment Variables
//!
//! - `CRAVE_API_BASE_URL` - Commerce API base URL
//! - `CRAVE_API_KEY` - Commerce API key

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crave_core::{CurrencyCode, LocationId, format_money};
use crave_storefront::commerce::{CommerceApi, CommerceClient};
use crave_storefront::config::CommerceApiConfig;
use crave_storefront::error::{AppError, Result};
use crave_storefront::models::SESSION_TTL;
use crave_storefront::session::{OrderingSession, SessionStatus};

use super::Context;

/// Parse a search parameter written as `key=value`.
///
/// # Errors
///
/// Returns a message if there is no `=` or the key is empty.
pub fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

/// Start or resume the ordering session for a location.
///
/// Ctrl-C while the request is in flight cancels it; a late reply is then
/// ignored.
///
/// # Errors
///
/// Returns an error if the commerce API is not configured or the session
/// cannot be established.
pub async fn start(
    ctx: &Context,
    location: &LocationId,
    search_params: BTreeMap<String, String>,
) -> Result<String> {
    let api_config = CommerceApiConfig::from_env()?;
    let client = CommerceClient::new(&api_config, ctx.gateway.auth_token())?;
    let mut session = OrderingSession::new(ctx.gateway.clone());

    if let Some(ticket) = session.begin(location, search_params) {
        let request = ticket.request.clone();
        tokio::select! {
            result = client.start_ordering_session(&request) => {
                session.complete(ticket, result);
            }
            _ = tokio::signal::ctrl_c() => {
                session.cancel();
                tracing::info!(location = %location, "Ordering session request cancelled");
                return Ok("Cancelled".to_string());
            }
        }
    }

    match session.status() {
        SessionStatus::Failed => Err(AppError::Session(
            session.error().unwrap_or("unknown error").to_string(),
        )),
        _ => Ok(describe(&client, &session, ctx.config.business.currency).await),
    }
}

async fn describe<A: CommerceApi>(
    api: &A,
    session: &OrderingSession,
    currency: CurrencyCode,
) -> String {
    let mut out = String::new();

    match (session.location(), session.cart_id()) {
        (Some(location), Some(cart_id)) => {
            let _ = write!(out, "Location {location}: cart {cart_id}");
            match api.get_cart(location, cart_id).await {
                Ok(cart) => {
                    let _ = write!(
                        out,
                        "\nRemote cart: {} items, total {}",
                        cart.item_count,
                        format_money(cart.total, currency)
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read remote cart");
                }
            }
        }
        (Some(location), None) => {
            let _ = write!(out, "Location {location}: no cart assigned");
        }
        _ => {}
    }

    if let Some(notice) = session.notice() {
        let _ = write!(out, "\nNotice: {notice}");
    }

    out
}

/// Show the stored session for a location.
pub fn show(ctx: &Context, location: &LocationId) -> String {
    ctx.gateway.load_session(location).map_or_else(
        || format!("No active session for {location}"),
        |stored| {
            let age_ms = ctx.gateway.now_ms().saturating_sub(stored.timestamp_ms);
            let ttl_ms = i64::try_from(SESSION_TTL.as_millis()).unwrap_or(i64::MAX);
            let remaining_mins = ttl_ms.saturating_sub(age_ms) / 60_000;
            format!(
                "Location {location}: cart {} (expires in {}h{:02}m)",
                stored.cart_id,
                remaining_mins / 60,
                remaining_mins % 60
            )
        },
    )
}

/// Forget the stored session for a location.
pub fn forget(ctx: &Context, location: &LocationId) -> String {
    ctx.gateway.remove_session(location);
    tracing::info!(location = %location, "Ordering session forgotten");
    format!("Forgot session for {location}")
}
