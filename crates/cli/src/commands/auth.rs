//! Auth token commands.
//!
//! The stored token is sent as a bearer token on commerce API calls.

use crave_storefront::error::{AppError, Result};

use super::Context;

/// Store the API auth token.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a blank token.
pub fn set_token(ctx: &Context, token: &str) -> Result<String> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("auth token must not be empty".to_string()));
    }
    ctx.gateway.set_auth_token(token);
    tracing::info!("Auth token stored");
    Ok("Auth token saved".to_string())
}

/// Remove the stored auth token.
pub fn clear(ctx: &Context) -> String {
    ctx.gateway.clear_auth_token();
    tracing::info!("Auth token cleared");
    "Auth token cleared".to_string()
}
