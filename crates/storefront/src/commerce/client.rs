//! HTTP client for the commerce backend.
//!
//! Uses `reqwest` for JSON over HTTPS. Remote cart reads are cached using
//! `moka` for the configured TTL.

use std::sync::Arc;

use crave_core::{CartId, LocationId};
use moka::future::Cache;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::{CommerceApi, CommerceError, RemoteCart, StartSessionRequest, StartSessionResponse};
use crate::config::CommerceApiConfig;

/// Maximum body length echoed into logs and errors.
const BODY_PREVIEW_LEN: usize = 200;

/// Client for the commerce backend API.
///
/// Cheaply cloneable; clones share the connection pool and cache.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    base_url: Url,
    auth_token: Option<SecretString>,
    cache: Cache<String, RemoteCart>,
}

impl std::fmt::Debug for CommerceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("authenticated", &self.inner.auth_token.is_some())
            .finish_non_exhaustive()
    }
}

impl CommerceClient {
    /// Create a new commerce API client.
    ///
    /// `auth_token` is sent as a bearer token when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(
        config: &CommerceApiConfig,
        auth_token: Option<String>,
    ) -> Result<Self, CommerceError> {
        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|e| CommerceError::InvalidHeader(format!("Invalid API key format: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert("x-api-key", api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                client,
                base_url: config.base_url.clone(),
                auth_token: auth_token.filter(|t| !t.is_empty()).map(SecretString::from),
                cache,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CommerceError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn location_path(location: &LocationId) -> String {
        format!("locations/{}", urlencoding::encode(location.as_str()))
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, CommerceError> {
        let Some(token) = &self.inner.auth_token else {
            return Ok(request);
        };
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| CommerceError::InvalidHeader(format!("Invalid auth token: {e}")))?;
        value.set_sensitive(true);
        Ok(request.header(AUTHORIZATION, value))
    }

    /// Send a request and decode a JSON response.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, CommerceError> {
        let response = self.authorize(request)?.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CommerceError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message = body.chars().take(BODY_PREVIEW_LEN).collect::<String>();
            tracing::error!(
                status = %status,
                body = %message,
                "Commerce API returned non-success status"
            );
            return Err(CommerceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(BODY_PREVIEW_LEN).collect::<String>(),
                "Failed to parse commerce API response"
            );
            CommerceError::Parse(e)
        })
    }

    /// Drop all cached remote carts.
    pub fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
    }
}

impl CommerceApi for CommerceClient {
    #[instrument(skip(self, request), fields(location = %request.location))]
    async fn start_ordering_session(
        &self,
        request: &StartSessionRequest,
    ) -> Result<StartSessionResponse, CommerceError> {
        let url = self.endpoint(&format!(
            "{}/ordering-session",
            Self::location_path(&request.location)
        ))?;

        let response: StartSessionResponse = self
            .execute(self.inner.client.post(url).json(request))
            .await?;

        debug!(
            cart_id = ?response.cart_id,
            has_message = response.error_message.is_some(),
            "Ordering session started"
        );
        Ok(response)
    }

    #[instrument(skip(self), fields(location = %location, cart_id = %cart_id))]
    async fn get_cart(
        &self,
        location: &LocationId,
        cart_id: &CartId,
    ) -> Result<RemoteCart, CommerceError> {
        let cache_key = format!("{location}:{cart_id}");

        if let Some(cart) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for remote cart");
            return Ok(cart);
        }

        let url = self.endpoint(&format!(
            "{}/carts/{}",
            Self::location_path(location),
            urlencoding::encode(cart_id.as_str())
        ))?;

        let cart: RemoteCart = self.execute(self.inner.client.get(url)).await?;

        self.inner.cache.insert(cache_key, cart.clone()).await;

        Ok(cart)
    }
}
