//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `STRIPE_SECRET_KEY` - Stripe API secret key
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8080)
//! - `PUBLIC_BASE_URL` - Absolute base for redirect URLs (default: http://localhost:{PORT})
//! - `SESSION_SECRET` - Cookie signing key, at least 64 bytes (default: random per process)
//! - `SESSION_TTL_SECS` - Lifetime of a login session in seconds (default: 604800, 7 days)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: https://api.stripe.com)
//! - `STRIPE_CURRENCY` - Currency of checkout sessions (default: usd)
//! - `CHECKOUT_ITEM_NAME` - Name of the aggregated line item (default: PRODUCT in TOTEMBO)
//! - `GATEWAY_TIMEOUT_SECS` - Stripe HTTP timeout in seconds (default: 10)

use thiserror::Error;

use crate::application::checkout_service::DEFAULT_ITEM_NAME;

pub const MIN_SESSION_SECRET_LENGTH: usize = 64;
pub const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_base: String,
    pub currency: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("currency", &self.currency)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
    /// `None` means a random key is generated at startup.
    pub session_secret: Option<Vec<u8>>,
    pub session_ttl_secs: i64,
    pub checkout_item_name: String,
    pub stripe: StripeConfig,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required =
            |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = required("DATABASE_URL")?;
        let host = or_default("HOST", "0.0.0.0");
        let port: u16 = parse("PORT", &or_default("PORT", "8080"))?;
        let public_base_url = or_default("PUBLIC_BASE_URL", &format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let session_secret = match lookup("SESSION_SECRET") {
            Some(secret) if secret.len() < MIN_SESSION_SECRET_LENGTH => {
                return Err(ConfigError::InvalidEnvVar(
                    "SESSION_SECRET".to_string(),
                    format!(
                        "must be at least {MIN_SESSION_SECRET_LENGTH} bytes (got {})",
                        secret.len()
                    ),
                ));
            }
            Some(secret) => Some(secret.into_bytes()),
            None => None,
        };

        let session_ttl_secs: i64 = parse(
            "SESSION_TTL_SECS",
            &or_default("SESSION_TTL_SECS", &DEFAULT_SESSION_TTL_SECS.to_string()),
        )?;
        if session_ttl_secs <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SESSION_TTL_SECS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let stripe = StripeConfig {
            secret_key: required("STRIPE_SECRET_KEY")?,
            api_base: or_default("STRIPE_API_BASE", "https://api.stripe.com"),
            currency: or_default("STRIPE_CURRENCY", "usd").to_lowercase(),
            timeout_secs: parse(
                "GATEWAY_TIMEOUT_SECS",
                &or_default("GATEWAY_TIMEOUT_SECS", "10"),
            )?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            public_base_url,
            session_secret,
            session_ttl_secs,
            checkout_item_name: or_default("CHECKOUT_ITEM_NAME", DEFAULT_ITEM_NAME),
            stripe,
        })
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
