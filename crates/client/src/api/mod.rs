//! HTTP client adapter for the CrowdFork REST API.
//!
//! # Architecture
//!
//! - Every outbound call goes through [`ApiClient::execute`], which owns the
//!   authentication policy so no call site re-implements expiry handling
//! - Protected endpoints fail fast with [`ApiError::Unauthenticated`] when no
//!   token is held, without touching the network
//! - A `401` clears the credential it was sent with and publishes a single
//!   [`SessionEvent::SessionExpired`](crate::credentials::SessionEvent); a
//!   `401` for a token that has since been replaced is a plain failure
//! - Restaurant details are cached via `moka` (5 minute TTL)
//!
//! # Example
//!
//! ```rust,ignore
//! use crowdfork_client::{ApiClient, ClientConfig, CredentialStore};
//!
//! let credentials = CredentialStore::new();
//! let api = ApiClient::new(&config, credentials.clone())?;
//!
//! api.login(&email, &password).await?;
//! let ids = api.favorite_ids().await?;
//! ```

mod account;
mod cache;
mod favorites;
mod restaurants;
mod reviews;
pub mod types;

pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, TokenLease};

use cache::{CacheKey, CacheValue};

const DETAIL_CACHE_TTL: Duration = Duration::from_secs(300);
const DETAIL_CACHE_CAPACITY: u64 = 500;
const GENERIC_FAILURE: &str = "Request failed";
const REPLACED_TOKEN_FAILURE: &str = "Request was sent before signing in again, please retry";

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A protected endpoint was called without a session token.
    #[error("Not signed in")]
    Unauthenticated,

    /// The backend rejected the session token.
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// The backend answered with a non-success status other than 401.
    #[error("{message} (HTTP {status})")]
    RequestFailed { status: u16, message: String },

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured base URL cannot carry a path.
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    /// Local validation rejected the request before it was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A request task stopped before reporting back, e.g. at shutdown.
    #[error("Request was interrupted")]
    Interrupted,
}

impl ApiError {
    /// Whether this error sends the user back to the login entry point.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::SessionExpired)
    }

    /// Short message suitable for inline display.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RequestFailed { message, .. } => message.clone(),
            Self::Http(e) if e.is_timeout() => "The server took too long to respond".to_string(),
            Self::Http(_) => "Could not reach the server".to_string(),
            Self::Parse(_) => "Unexpected response from the server".to_string(),
            other => other.to_string(),
        }
    }
}

/// Whether an endpoint needs the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    /// Token attached when present, never required.
    Public,
    /// Token required; absent token fails fast.
    Protected,
}

/// One outbound request, described independently of the transport.
#[derive(Debug)]
pub(crate) struct ApiRequest {
    method: Method,
    segments: Vec<String>,
    access: Access,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
    failure_message: &'static str,
}

impl ApiRequest {
    fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            access: Access::Public,
            query: Vec::new(),
            body: None,
            failure_message: GENERIC_FAILURE,
        }
    }

    pub(crate) fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::GET, segments)
    }

    pub(crate) fn post<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::POST, segments)
    }

    pub(crate) fn put<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::PUT, segments)
    }

    pub(crate) fn delete<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::DELETE, segments)
    }

    pub(crate) const fn protected(mut self) -> Self {
        self.access = Access::Protected;
        self
    }

    pub(crate) fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub(crate) fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Message used when the error body carries no detail.
    pub(crate) const fn on_failure(mut self, message: &'static str) -> Self {
        self.failure_message = message;
        self
    }

    fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the CrowdFork REST API.
///
/// Cheap to clone; all clones share the HTTP pool, the detail cache and the
/// credential store.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    credentials: CredentialStore,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("credentials", &self.inner.credentials)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client bound to `credentials`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path or the HTTP client
    /// fails to build.
    pub fn new(config: &ClientConfig, credentials: CredentialStore) -> Result<Self, ApiError> {
        if config.api_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(config.api_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(DETAIL_CACHE_CAPACITY)
            .time_to_live(DETAIL_CACHE_TTL)
            .support_invalidation_closures()
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                credentials,
                cache,
            }),
        })
    }

    /// The credential store this client authenticates with.
    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    /// Build the absolute URL for a request.
    fn endpoint(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(&request.segments);

        if !request.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(request.query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url)
    }

    /// Send a request and return the raw response body on success.
    ///
    /// This is the single place where the authentication policy lives.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path()))]
    pub(crate) async fn execute(&self, request: ApiRequest) -> Result<String, ApiError> {
        let credentials = &self.inner.credentials;
        let lease: Option<TokenLease> = match (request.access, credentials.lease()) {
            (Access::Protected, None) => {
                debug!("Protected endpoint called without a session");
                credentials.require_login();
                return Err(ApiError::Unauthenticated);
            }
            (_, lease) => lease,
        };

        let url = self.endpoint(&request)?;
        let mut builder = self.inner.client.request(request.method.clone(), url);
        if let Some(lease) = &lease {
            builder = builder.bearer_auth(lease.token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(match lease {
                Some(lease) => {
                    if !credentials.expire(lease.epoch) && credentials.has() {
                        // Rejected token was already replaced; the session is fine.
                        debug!(epoch = lease.epoch, "Rejection of a replaced token");
                        ApiError::RequestFailed {
                            status: status.as_u16(),
                            message: REPLACED_TOKEN_FAILURE.to_string(),
                        }
                    } else {
                        ApiError::SessionExpired
                    }
                }
                None => {
                    credentials.require_login();
                    ApiError::Unauthenticated
                }
            });
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message = extract_error_message(&body)
                .unwrap_or_else(|| request.failure_message.to_string());
            warn!(
                status = %status,
                message = %message,
                "Backend returned non-success status"
            );
            return Err(ApiError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    /// Send a request and decode its JSON body.
    pub(crate) async fn execute_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let body = self.execute(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }
}

/// Pull a human-readable message out of an error body.
///
/// Looks at `detail` (string, or list of `{msg}` validation errors), then
/// `error`, then `message`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let from_detail = match value.get("detail") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    };

    from_detail
        .or_else(|| {
            ["error", "message"].iter().find_map(|key| {
                value
                    .get(key)
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
            })
        })
        .filter(|message| !message.trim().is_empty())
}
