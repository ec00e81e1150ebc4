//! Commerce backend API.
//!
//! The ordering-session bootstrap talks to the backend through the
//! [`CommerceApi`] trait; [`CommerceClient`] is the HTTP implementation.
//!
//! # Endpoints
//!
//! - `POST {base}/locations/{location}/ordering-session` binds a visitor to a
//!   remote cart, reusing `existingCartId` when the backend still knows it.
//! - `GET {base}/locations/{location}/carts/{cartId}` reads the remote cart
//!   summary. Responses are cached briefly.

mod client;

pub use client::CommerceClient;

use std::collections::BTreeMap;
use std::future::Future;

use crave_core::{CartId, LocationId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not decode.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A header value contained invalid characters.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Body of an ordering-session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    /// Location the session is for. Part of the path, not the body.
    #[serde(skip)]
    pub location: LocationId,
    /// Query parameters from the page that started the session.
    pub search_params: BTreeMap<String, String>,
    /// Previously bound cart, if one is still valid locally.
    pub existing_cart_id: Option<CartId>,
}

/// Backend reply to an ordering-session request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    /// Cart bound to the session.
    #[serde(default)]
    pub cart_id: Option<CartId>,
    /// Non-fatal message to show the visitor.
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Remote cart summary as computed by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCart {
    pub id: CartId,
    pub subtotal: f64,
    pub tax: f64,
    pub delivery_fee: f64,
    pub total: f64,
    pub item_count: u32,
}

/// Operations the storefront needs from the commerce backend.
pub trait CommerceApi: Send + Sync {
    /// Create or resume the ordering session for a location.
    fn start_ordering_session(
        &self,
        request: &StartSessionRequest,
    ) -> impl Future<Output = Result<StartSessionResponse, CommerceError>> + Send;

    /// Read a remote cart summary.
    fn get_cart(
        &self,
        location: &LocationId,
        cart_id: &CartId,
    ) -> impl Future<Output = Result<RemoteCart, CommerceError>> + Send;
}
