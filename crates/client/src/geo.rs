//! Device location acquisition.
//!
//! The platform capability is abstracted behind [`LocationProvider`] so the
//! resolver can be driven by a fixed position, a platform integration, or a
//! test double.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crowdfork_core::Coordinates;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Reasons a location could not be obtained.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeoError {
    /// The platform has no location capability.
    #[error("Geolocation is not supported")]
    Unsupported,

    /// The user or platform refused access.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The provider did not answer in time.
    #[error("Timed out waiting for location")]
    Timeout,

    /// The provider failed for another reason.
    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Source of device coordinates.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Ask the platform for the current position.
    async fn current_location(&self) -> Result<Coordinates, GeoError>;
}

/// Provider that always answers with a configured position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Result<Coordinates, GeoError> {
        Ok(self.0)
    }
}

/// Provider for platforms without a location capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_location(&self) -> Result<Coordinates, GeoError> {
        Err(GeoError::Unsupported)
    }
}

/// Resolves device coordinates on demand, bounded by a timeout.
#[derive(Clone)]
pub struct GeolocationResolver {
    provider: Arc<dyn LocationProvider>,
    timeout: Duration,
}

impl std::fmt::Debug for GeolocationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeolocationResolver")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeolocationResolver {
    /// Create a resolver around `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn LocationProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Resolver backed by a fixed position, or [`NoLocation`] when `None`.
    #[must_use]
    pub fn from_position(position: Option<Coordinates>, timeout: Duration) -> Self {
        let provider: Arc<dyn LocationProvider> = match position {
            Some(coords) => Arc::new(FixedLocation(coords)),
            None => Arc::new(NoLocation),
        };
        Self::new(provider, timeout)
    }

    /// Acquire the current position.
    ///
    /// # Errors
    ///
    /// Returns the provider's error, or [`GeoError::Timeout`] if it does not
    /// answer within the configured timeout.
    #[instrument(skip(self))]
    pub async fn resolve(&self) -> Result<Coordinates, GeoError> {
        match tokio::time::timeout(self.timeout, self.provider.current_location()).await {
            Ok(Ok(coords)) => {
                debug!(%coords, "Resolved device location");
                Ok(coords)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Location provider failed");
                Err(e)
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis(), "Location provider timed out");
                Err(GeoError::Timeout)
            }
        }
    }
}
