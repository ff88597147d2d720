//! GeoArt configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GEOART_DATABASE_URL` - `PostgreSQL` connection string (fallback `DATABASE_URL`)
//! - `GEOART_BASE_URL` - Public front-end URL; success/cancel pages hang off it
//! - `STRIPE_SECRET_KEY` - Stripe API secret key
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook signing secret
//! - `PRINTIFY_API_TOKEN` - Printify personal access token
//! - `PRINTIFY_SHOP_ID` - Printify shop the storefront sells through
//! - `FIREBASE_PROJECT_ID` - Firebase project that issues ID tokens
//!
//! ## Optional
//! - `GEOART_HOST` - Bind address (default: 127.0.0.1)
//! - `GEOART_PORT` - Listen port (default: 3000)
//! - `GEOART_HTTP_TIMEOUT_SECS` - Timeout for every outbound call (default: 15)
//! - `GEOART_OPERATOR_TOKEN` - Bearer token for the operator fulfillment endpoint
//! - `CHECKOUT_CURRENCY` - ISO 4217 code (default: usd)
//! - `CHECKOUT_FREE_SHIPPING_THRESHOLD` - Subtotal that ships free (default: 50.00)
//! - `CHECKOUT_FLAT_SHIPPING_RATE` - Shipping below the threshold (default: 8.00)
//! - `CHECKOUT_ALLOWED_COUNTRIES` - Comma-separated shipping countries (default: US)
//! - `STRIPE_WEBHOOK_TOLERANCE_SECS` - Signature timestamp tolerance (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use geoart_core::{CurrencyCode, Price};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// GeoArt application configuration.
#[derive(Debug, Clone)]
pub struct GeoArtConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the front end
    pub base_url: String,
    /// Timeout applied to every outbound HTTP call
    pub http_timeout: Duration,
    /// Bearer token for operator-only endpoints (disabled when absent)
    pub operator_token: Option<SecretString>,
    /// Checkout pricing and redirect settings
    pub checkout: CheckoutSettings,
    /// Stripe configuration
    pub stripe: StripeConfig,
    /// Printify configuration
    pub printify: PrintifyConfig,
    /// Firebase identity configuration
    pub firebase: FirebaseConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Checkout settings shared by the session builder.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Currency every line item is charged in
    pub currency: CurrencyCode,
    /// Subtotals at or above this ship free
    pub free_shipping_threshold: Price,
    /// Flat shipping charged below the threshold
    pub flat_shipping_rate: Price,
    /// Countries the hosted page may collect a shipping address for
    pub allowed_countries: Vec<String>,
    /// Where the payment page sends the payer after success
    pub success_url: String,
    /// Where the payment page sends the payer after cancelling
    pub cancel_url: String,
}

impl CheckoutSettings {
    /// Settings with the documented defaults and redirects under `base_url`.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            currency: CurrencyCode::Usd,
            free_shipping_threshold: Price::from_minor_units(5000),
            flat_shipping_rate: Price::from_minor_units(800),
            allowed_countries: vec!["US".to_owned()],
            success_url: format!("{base}/checkout/success"),
            cancel_url: format!("{base}/checkout/cancel"),
        }
    }
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`)
    pub secret_key: SecretString,
    /// Webhook signing secret (`whsec_...`)
    pub webhook_secret: SecretString,
    /// Maximum age of a signed webhook timestamp
    pub webhook_tolerance: Duration,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("webhook_tolerance", &self.webhook_tolerance)
            .finish()
    }
}

/// Printify API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct PrintifyConfig {
    /// Personal access token scoped to the storefront account
    pub api_token: SecretString,
    /// Shop the storefront sells through
    pub shop_id: String,
}

impl std::fmt::Debug for PrintifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintifyConfig")
            .field("api_token", &"[REDACTED]")
            .field("shop_id", &self.shop_id)
            .finish()
    }
}

/// Firebase identity configuration.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Project id; ID tokens must carry it as audience
    pub project_id: String,
}

impl GeoArtConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("GEOART_DATABASE_URL")?;
        let host = parse_env_or_default::<IpAddr>("GEOART_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("GEOART_PORT", "3000")?;
        let base_url = get_required_env("GEOART_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("GEOART_BASE_URL".to_string(), e.to_string())
        })?;
        let http_timeout =
            Duration::from_secs(parse_env_or_default::<u64>("GEOART_HTTP_TIMEOUT_SECS", "15")?);
        let operator_token = match get_optional_env("GEOART_OPERATOR_TOKEN") {
            Some(value) => {
                validate_secret_strength(&value, "GEOART_OPERATOR_TOKEN")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        let checkout = CheckoutSettings::from_env(&base_url)?;
        let stripe = StripeConfig::from_env()?;
        let printify = PrintifyConfig::from_env()?;
        let firebase = FirebaseConfig {
            project_id: get_required_env("FIREBASE_PROJECT_ID")?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            http_timeout,
            operator_token,
            checkout,
            stripe,
            printify,
            firebase,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default::<f32>("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default::<f32>(
                "SENTRY_TRACES_SAMPLE_RATE",
                "0.0",
            )?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CheckoutSettings {
    fn from_env(base_url: &str) -> Result<Self, ConfigError> {
        let defaults = Self::with_base_url(base_url);
        let currency = get_optional_env("CHECKOUT_CURRENCY")
            .map(|value| {
                CurrencyCode::from_str(&value)
                    .map_err(|e| ConfigError::InvalidEnvVar("CHECKOUT_CURRENCY".to_string(), e))
            })
            .transpose()?
            .unwrap_or(defaults.currency);
        let free_shipping_threshold = get_price_or_default(
            "CHECKOUT_FREE_SHIPPING_THRESHOLD",
            defaults.free_shipping_threshold,
        )?;
        let flat_shipping_rate =
            get_price_or_default("CHECKOUT_FLAT_SHIPPING_RATE", defaults.flat_shipping_rate)?;
        let allowed_countries = get_optional_env("CHECKOUT_ALLOWED_COUNTRIES").map_or(
            defaults.allowed_countries,
            |value| {
                value
                    .split(',')
                    .map(|c| c.trim().to_ascii_uppercase())
                    .filter(|c| !c.is_empty())
                    .collect()
            },
        );

        Ok(Self {
            currency,
            free_shipping_threshold,
            flat_shipping_rate,
            allowed_countries,
            ..defaults
        })
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            webhook_secret: get_validated_secret("STRIPE_WEBHOOK_SECRET")?,
            webhook_tolerance: Duration::from_secs(parse_env_or_default::<u64>(
                "STRIPE_WEBHOOK_TOLERANCE_SECS",
                "300",
            )?),
        })
    }
}

impl PrintifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_token: get_validated_secret("PRINTIFY_API_TOKEN")?,
            shop_id: get_required_env("PRINTIFY_SHOP_ID")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Parse an environment variable, falling back to a default literal.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a positive decimal price, falling back to a default.
fn get_price_or_default(key: &str, default: Price) -> Result<Price, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    let amount = Decimal::from_str(&raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if amount.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(Price::new(amount))
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

    // Real API keys and signing secrets have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the value issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-stripe-key-here", "STRIPE_SECRET_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_stripe_shaped_key() {
        let result =
            validate_secret_strength("sk_test_51HqLyjWDarjtT1zdp7dcXAmpLe", "STRIPE_SECRET_KEY");
        assert!(result.is_ok());
    }

    #[test]
    fn test_checkout_defaults() {
        let settings = CheckoutSettings::with_base_url("https://geoart.shop/");
        assert_eq!(settings.success_url, "https://geoart.shop/checkout/success");
        assert_eq!(settings.cancel_url, "https://geoart.shop/checkout/cancel");
        assert_eq!(settings.free_shipping_threshold, Price::from_minor_units(5000));
        assert_eq!(settings.flat_shipping_rate, Price::from_minor_units(800));
        assert_eq!(settings.allowed_countries, vec!["US".to_owned()]);
    }

    #[test]
    fn test_stripe_config_debug_redacts_secrets() {
        let config = StripeConfig {
            secret_key: SecretString::from("sk_live_super_sensitive"),
            webhook_secret: SecretString::from("whsec_super_sensitive"),
            webhook_tolerance: Duration::from_secs(300),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_sensitive"));
    }

    #[test]
    fn test_printify_config_debug_redacts_token() {
        let config = PrintifyConfig {
            api_token: SecretString::from("eyJ0eXAiOiJKV1QiLCJhbGciOi"),
            shop_id: "20720471".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("20720471"));
        assert!(!debug_output.contains("eyJ0eXAi"));
    }
}
