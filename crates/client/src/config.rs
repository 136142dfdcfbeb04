//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CROWDFORK_API_URL` - Backend base URL (default: `http://127.0.0.1:8000`)
//! - `CROWDFORK_APP_URL` - Shareable search page URL (default: `http://localhost:5173/search`)
//! - `CROWDFORK_AUTH_TOKEN` - Bearer token from a previous login
//! - `CROWDFORK_SUGGEST_DEBOUNCE_MS` - Autocomplete quiet period (default: 250)
//! - `CROWDFORK_FALLBACK_CITY` - Location used when none is known (default: `San Francisco, CA`)
//! - `CROWDFORK_LISTING_LIMIT` - Size of the default feed (default: 20)
//! - `CROWDFORK_SIMILAR_LIMIT` - Similar restaurants per detail page (default: 5)
//! - `CROWDFORK_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `CROWDFORK_GEOLOCATION_TIMEOUT_MS` - Device location timeout (default: 5000)
//! - `CROWDFORK_LATITUDE` / `CROWDFORK_LONGITUDE` - Fixed device position

use std::time::Duration;

use crowdfork_core::Coordinates;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_APP_URL: &str = "http://localhost:5173/search";
pub const DEFAULT_FALLBACK_CITY: &str = "San Francisco, CA";
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;
pub const DEFAULT_LISTING_LIMIT: u32 = 20;
pub const DEFAULT_SIMILAR_LIMIT: u32 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_GEOLOCATION_TIMEOUT_MS: u64 = 5000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Discovery client configuration.
///
/// Implements `Debug` manually to redact the auth token.
#[derive(Clone)]
pub struct ClientConfig {
    /// Backend REST API base URL
    pub api_url: Url,
    /// Page URL that carries the shareable `q`/`loc` query parameters
    pub app_url: Url,
    /// Bearer token carried over from a previous login
    pub auth_token: Option<SecretString>,
    /// Quiet period before an autocomplete request fires
    pub suggest_debounce: Duration,
    /// Location text used when neither text nor coordinates are known
    pub fallback_city: String,
    /// Number of restaurants in the default (no text) feed
    pub listing_limit: u32,
    /// Number of similar restaurants fetched alongside a detail lookup
    pub similar_limit: u32,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
    /// Upper bound on a device location lookup
    pub geolocation_timeout: Duration,
    /// Fixed device position, when the platform provides one
    pub device_location: Option<Coordinates>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url.as_str())
            .field("app_url", &self.app_url.as_str())
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("suggest_debounce", &self.suggest_debounce)
            .field("fallback_city", &self.fallback_city)
            .field("listing_limit", &self.listing_limit)
            .field("similar_limit", &self.similar_limit)
            .field("request_timeout", &self.request_timeout)
            .field("geolocation_timeout", &self.geolocation_timeout)
            .field("device_location", &self.device_location)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_api(default_url(DEFAULT_API_URL))
    }
}

impl ClientConfig {
    /// Configuration with defaults for everything except the backend URL.
    #[must_use]
    pub fn for_api(api_url: Url) -> Self {
        Self {
            api_url,
            app_url: default_url(DEFAULT_APP_URL),
            auth_token: None,
            suggest_debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            fallback_city: DEFAULT_FALLBACK_CITY.to_string(),
            listing_limit: DEFAULT_LISTING_LIMIT,
            similar_limit: DEFAULT_SIMILAR_LIMIT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            geolocation_timeout: Duration::from_millis(DEFAULT_GEOLOCATION_TIMEOUT_MS),
            device_location: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_url(
            "CROWDFORK_API_URL",
            &get_env_or_default("CROWDFORK_API_URL", DEFAULT_API_URL),
        )?;
        let app_url = parse_url(
            "CROWDFORK_APP_URL",
            &get_env_or_default("CROWDFORK_APP_URL", DEFAULT_APP_URL),
        )?;
        let auth_token = get_optional_env("CROWDFORK_AUTH_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);

        let suggest_debounce = Duration::from_millis(parse_env_or_default(
            "CROWDFORK_SUGGEST_DEBOUNCE_MS",
            DEFAULT_DEBOUNCE_MS,
        )?);
        let fallback_city = get_env_or_default("CROWDFORK_FALLBACK_CITY", DEFAULT_FALLBACK_CITY);
        let listing_limit = parse_env_or_default("CROWDFORK_LISTING_LIMIT", DEFAULT_LISTING_LIMIT)?;
        let similar_limit = parse_env_or_default("CROWDFORK_SIMILAR_LIMIT", DEFAULT_SIMILAR_LIMIT)?;
        let request_timeout = Duration::from_secs(parse_env_or_default(
            "CROWDFORK_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let geolocation_timeout = Duration::from_millis(parse_env_or_default(
            "CROWDFORK_GEOLOCATION_TIMEOUT_MS",
            DEFAULT_GEOLOCATION_TIMEOUT_MS,
        )?);
        let device_location = get_device_location()?;

        Ok(Self {
            api_url,
            app_url,
            auth_token,
            suggest_debounce,
            fallback_city,
            listing_limit,
            similar_limit,
            request_timeout,
            geolocation_timeout,
            device_location,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Both halves of the fixed device position must be given together.
fn get_device_location() -> Result<Option<Coordinates>, ConfigError> {
    let lat = get_optional_env("CROWDFORK_LATITUDE");
    let lon = get_optional_env("CROWDFORK_LONGITUDE");
    match (lat, lon) {
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::MissingEnvVar("CROWDFORK_LONGITUDE".to_string())),
        (None, Some(_)) => Err(ConfigError::MissingEnvVar("CROWDFORK_LATITUDE".to_string())),
        (Some(lat), Some(lon)) => parse_coordinates(&lat, &lon).map(Some),
    }
}

fn parse_coordinates(lat: &str, lon: &str) -> Result<Coordinates, ConfigError> {
    let lat = lat
        .trim()
        .parse::<f64>()
        .map_err(|e| ConfigError::InvalidEnvVar("CROWDFORK_LATITUDE".to_string(), e.to_string()))?;
    let lon = lon.trim().parse::<f64>().map_err(|e| {
        ConfigError::InvalidEnvVar("CROWDFORK_LONGITUDE".to_string(), e.to_string())
    })?;
    Coordinates::new(lat, lon)
        .map_err(|e| ConfigError::InvalidEnvVar("CROWDFORK_LATITUDE".to_string(), e.to_string()))
}

/// Parse one of the compile-time default URLs.
fn default_url(raw: &'static str) -> Url {
    // The defaults are literals covered by tests.
    Url::parse(raw).unwrap_or_else(|_| unreachable!("invalid default url {raw}"))
}
