//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Business rules (all optional)
//! - `CRAVE_TAX_RATE` - Sales tax rate as a fraction (default: 0.08875)
//! - `CRAVE_TIP_PERCENTAGES` - Comma-separated tip fractions (default: 0.15,0.18,0.20)
//! - `CRAVE_DELIVERY_FEE` - Flat delivery fee (default: 2.99)
//! - `CRAVE_MINIMUM_ORDER` - Minimum pre-tax subtotal (default: 15.00)
//! - `CRAVE_CURRENCY` - ISO 4217 code (default: USD)
//! - `CRAVE_LOCALE` - Display locale (default: en-US)
//! - `CRAVE_MAX_QUANTITY_PER_ITEM` - Per-line quantity cap (default: 99)
//! - `CRAVE_MAX_TOTAL_LINES` - Distinct line cap (default: 50)
//! - `CRAVE_SESSION_TIMEOUT_SECS` - Maximum age of a persisted cart (default: 86400)
//! - `CRAVE_DELIVERY_RADIUS_MILES` - Delivery radius (default: 5.0)
//!
//! ## Storage and telemetry (optional)
//! - `CRAVE_DATA_DIR` - Directory for the file-backed store (default: .crave)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! ## Commerce API (required only for ordering sessions)
//! - `CRAVE_API_BASE_URL` - Base URL of the commerce API
//! - `CRAVE_API_KEY` - API key sent as `x-api-key`
//! - `CRAVE_API_CACHE_TTL_SECS` - Remote cart cache TTL (default: 60)

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crave_core::{BusinessConfig, CurrencyCode};
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_DATA_DIR: &str = ".crave";
const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Pricing rules and cart limits
    pub business: BusinessConfig,
    /// Directory used by the file-backed store
    pub data_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Commerce API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct CommerceApiConfig {
    /// Base URL of the commerce API
    pub base_url: Url,
    /// API key sent with every request
    pub api_key: SecretString,
    /// How long remote cart reads are cached
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for CommerceApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a business rule variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&env_lookup)
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a business rule variable is present but invalid.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            business: business_config_from(lookup)?,
            data_dir: lookup("CRAVE_DATA_DIR").map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            sentry_dsn: lookup("SENTRY_DSN").filter(|s| !s.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT").filter(|s| !s.is_empty()),
        })
    }
}

impl CommerceApiConfig {
    /// Load commerce API settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the base URL or API key is missing or invalid,
    /// or if the key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(&env_lookup)
    }

    /// Load commerce API settings from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`CommerceApiConfig::from_env`].
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = required(lookup, "CRAVE_API_BASE_URL")?;
        let base_url = parse_base_url(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("CRAVE_API_BASE_URL".to_string(), e))?;

        let api_key = required(lookup, "CRAVE_API_KEY")?;
        validate_secret_strength(&api_key, "CRAVE_API_KEY")?;

        let ttl_secs = parse_or(lookup, "CRAVE_API_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;

        Ok(Self {
            base_url,
            api_key: SecretString::from(api_key),
            cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

/// Parse a base URL, forcing a trailing slash so relative joins keep the path.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("URL cannot be used as a base".to_string());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Build business rules from variables, falling back to defaults.
fn business_config_from(lookup: &dyn Fn(&str) -> Option<String>) -> Result<BusinessConfig, ConfigError> {
    let defaults = BusinessConfig::default();

    let tax_rate = parse_or(lookup, "CRAVE_TAX_RATE", defaults.tax_rate)?;
    if !(0.0..1.0).contains(&tax_rate) {
        return Err(invalid("CRAVE_TAX_RATE", "must be a fraction between 0 and 1"));
    }

    let tip_percentages = match lookup("CRAVE_TIP_PERCENTAGES") {
        Some(raw) => parse_tip_percentages(&raw)?,
        None => defaults.tip_percentages,
    };

    let delivery_fee = non_negative(
        "CRAVE_DELIVERY_FEE",
        parse_or(lookup, "CRAVE_DELIVERY_FEE", defaults.delivery_fee)?,
    )?;
    let minimum_order_amount = non_negative(
        "CRAVE_MINIMUM_ORDER",
        parse_or(lookup, "CRAVE_MINIMUM_ORDER", defaults.minimum_order_amount)?,
    )?;
    let delivery_radius_miles = non_negative(
        "CRAVE_DELIVERY_RADIUS_MILES",
        parse_or(lookup, "CRAVE_DELIVERY_RADIUS_MILES", defaults.delivery_radius_miles)?,
    )?;

    let currency = match lookup("CRAVE_CURRENCY") {
        Some(raw) => CurrencyCode::from_str(&raw).map_err(|e| invalid("CRAVE_CURRENCY", &e))?,
        None => defaults.currency,
    };
    let locale = lookup("CRAVE_LOCALE").unwrap_or(defaults.locale);

    let max_quantity_per_item = parse_or(
        lookup,
        "CRAVE_MAX_QUANTITY_PER_ITEM",
        defaults.max_quantity_per_item,
    )?;
    if max_quantity_per_item == 0 {
        return Err(invalid("CRAVE_MAX_QUANTITY_PER_ITEM", "must be at least 1"));
    }

    let max_total_lines = parse_or(lookup, "CRAVE_MAX_TOTAL_LINES", defaults.max_total_lines)?;
    if max_total_lines == 0 {
        return Err(invalid("CRAVE_MAX_TOTAL_LINES", "must be at least 1"));
    }

    let session_timeout = parse_or(
        lookup,
        "CRAVE_SESSION_TIMEOUT_SECS",
        defaults.session_timeout.as_secs(),
    )
    .map(Duration::from_secs)?;

    Ok(BusinessConfig {
        tax_rate,
        tip_percentages,
        delivery_fee,
        minimum_order_amount,
        currency,
        locale,
        max_quantity_per_item,
        max_total_lines,
        session_timeout,
        delivery_radius_miles,
    })
}

fn parse_tip_percentages(raw: &str) -> Result<Vec<f64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .ok()
                .filter(|p| p.is_finite() && *p >= 0.0)
                .ok_or_else(|| invalid("CRAVE_TIP_PERCENTAGES", &format!("invalid percentage '{s}'")))
        })
        .collect()
}

// =============================================================================
// Helper Functions
// =============================================================================

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get a required variable.
fn required(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse a variable if present, otherwise use the default.
fn parse_or<T>(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn non_negative(key: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(invalid(key, "must be a non-negative number"))
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real API keys have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the commerce API."
            ),
        ));
    }

    Ok(())
}
