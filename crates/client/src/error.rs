//! Unified error type for the discovery session.
//!
//! Components return their own error enums; [`ClientError`] aggregates them
//! for callers that drive several components, such as the CLI.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::geo::GeoError;

/// Any error the discovery client can produce.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Backend or transport failure.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// No device location could be obtained.
    #[error("Location unavailable: {0}")]
    LocationUnavailable(#[from] GeoError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input rejected before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// Whether the user has to sign in (again) before retrying.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        match self {
            Self::Api(e) => e.requires_login(),
            _ => false,
        }
    }

    /// Short message suitable for inline display.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

impl From<crowdfork_core::EmailError> for ClientError {
    fn from(e: crowdfork_core::EmailError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

impl From<crowdfork_core::RatingError> for ClientError {
    fn from(e: crowdfork_core::RatingError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}
