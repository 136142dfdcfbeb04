//! Search orchestration.
//!
//! [`SearchOrchestrator`] owns the authoritative [`Query`], turns it into a
//! search or listing request, and replaces the result set when the request
//! completes. Dispatches may overlap; each takes the next generation number
//! and only the most recently issued one is allowed to touch state.

pub mod query;
pub mod url_state;

pub use query::{Query, SearchRequest};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crowdfork_core::Coordinates;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::api::{ApiClient, ApiError, RestaurantSummary};
use crate::config::ClientConfig;
use crate::geo::{GeoError, GeolocationResolver};

/// What became of a dispatch that reached the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Results were replaced.
    Applied,
    /// A newer dispatch was issued while this one was in flight; its
    /// response was discarded.
    Stale,
}

/// Point-in-time view of the search page.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSnapshot {
    pub query: Query,
    pub results: Vec<RestaurantSummary>,
    pub loading: bool,
    pub error: Option<String>,
    /// Shareable URL of the last applied search.
    pub url: Url,
    pub generation: u64,
}

struct SearchState {
    query: Query,
    issued: u64,
    results: Vec<RestaurantSummary>,
    loading: bool,
    error: Option<String>,
    url: Url,
    mounted: bool,
    /// Bumped by every change to the location or coordinates.
    location_edits: u64,
}

impl SearchState {
    fn replace_query(&mut self, query: Query) {
        self.query = query;
        self.location_edits += 1;
    }
}

struct SearchInner {
    api: ApiClient,
    fallback_city: String,
    listing_limit: u32,
    page_url: Url,
    state: Mutex<SearchState>,
}

/// Owns the query and the result set of the search page.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SearchOrchestrator {
    inner: Arc<SearchInner>,
}

impl std::fmt::Debug for SearchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOrchestrator")
            .field("fallback_city", &self.inner.fallback_city)
            .field("listing_limit", &self.inner.listing_limit)
            .field("page_url", &self.inner.page_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SearchOrchestrator {
    #[must_use]
    pub fn new(api: ApiClient, config: &ClientConfig) -> Self {
        Self {
            inner: Arc::new(SearchInner {
                api,
                fallback_city: config.fallback_city.clone(),
                listing_limit: config.listing_limit,
                page_url: config.app_url.clone(),
                state: Mutex::new(SearchState {
                    query: Query::default(),
                    issued: 0,
                    results: Vec::new(),
                    loading: false,
                    error: None,
                    url: config.app_url.clone(),
                    mounted: false,
                    location_edits: 0,
                }),
            }),
        }
    }

    // =========================================================================
    // Query editing
    // =========================================================================

    pub fn set_text(&self, text: impl Into<String>) {
        self.state().query.set_text(text);
    }

    /// Typed location; cancels coordinates mode.
    pub fn set_location_text(&self, location: impl Into<String>) {
        let mut state = self.state();
        state.query.set_location_text(location);
        state.location_edits += 1;
    }

    /// Device coordinates; clears the typed location.
    pub fn set_coordinates(&self, coordinates: Coordinates) {
        let mut state = self.state();
        state.query.set_coordinates(coordinates);
        state.location_edits += 1;
    }

    /// Acquire device coordinates and switch the query to them.
    ///
    /// A location edited while the lookup is running takes precedence: the
    /// coordinates are returned but not applied. On failure the query keeps
    /// its location, or takes the fallback city when it had none.
    ///
    /// # Errors
    ///
    /// Returns the resolver's [`GeoError`] when no position is available.
    #[instrument(skip(self, resolver))]
    pub async fn use_current_location(
        &self,
        resolver: &GeolocationResolver,
    ) -> Result<Coordinates, GeoError> {
        let edits_before = self.state().location_edits;

        match resolver.resolve().await {
            Ok(coords) => {
                let mut state = self.state();
                if state.location_edits == edits_before {
                    state.query.set_coordinates(coords);
                    state.location_edits += 1;
                } else {
                    debug!("Location edited during lookup, keeping the edit");
                }
                Ok(coords)
            }
            Err(e) => {
                let mut state = self.state();
                if state.query.has_no_location() {
                    info!(city = %self.inner.fallback_city, "Falling back to default city");
                    state.query.set_location_text(self.inner.fallback_city.clone());
                    state.location_edits += 1;
                }
                Err(e)
            }
        }
    }

    /// The current query.
    #[must_use]
    pub fn query(&self) -> Query {
        self.state().query.clone()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Run the current query against the backend.
    ///
    /// Non-empty text searches; empty text loads the default feed. On success
    /// the result set is replaced and the shareable URL is rewritten. On
    /// failure previous results are kept and a user-visible error is set.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without touching state when no
    /// session is held, or the backend error of the latest dispatch.
    #[instrument(skip(self))]
    pub async fn dispatch(&self) -> Result<DispatchOutcome, ApiError> {
        let credentials = self.inner.api.credentials();
        if !credentials.has() {
            credentials.require_login();
            return Err(ApiError::Unauthenticated);
        }

        let (generation, query, request) = {
            let mut state = self.state();
            state.issued += 1;
            state.loading = true;
            let query = state.query.clone();
            let request = query.to_request(&self.inner.fallback_city, self.inner.listing_limit);
            (state.issued, query, request)
        };

        debug!(generation, ?request, "Dispatching search");
        let result = match &request {
            SearchRequest::Search(params) => self.inner.api.search(params).await,
            SearchRequest::Listing { limit } => {
                self.inner.api.list_restaurants(*limit, None).await
            }
        };

        let mut state = self.state();
        if generation != state.issued {
            debug!(generation, latest = state.issued, "Discarding stale search response");
            return Ok(DispatchOutcome::Stale);
        }

        state.loading = false;
        match result {
            Ok(results) => {
                debug!(generation, count = results.len(), "Applying search results");
                state.results = results;
                state.error = None;
                state.url = url_state::write(&self.inner.page_url, &query);
                Ok(DispatchOutcome::Applied)
            }
            Err(e) => {
                warn!(generation, error = %e, "Search failed");
                state.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Replace the query text and dispatch immediately.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch`].
    pub async fn submit(&self, text: impl Into<String>) -> Result<DispatchOutcome, ApiError> {
        self.set_text(text);
        self.dispatch().await
    }

    /// Initialise the query from a shareable URL and dispatch.
    ///
    /// The URL is read only on the first mount; later calls re-dispatch the
    /// current query.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch`].
    pub async fn mount(&self, url: &Url) -> Result<DispatchOutcome, ApiError> {
        {
            let mut state = self.state();
            if !state.mounted {
                state.mounted = true;
                state.replace_query(url_state::read(url));
            }
        }
        self.dispatch().await
    }

    /// Navigation to a pre-filled search URL: decode it and dispatch.
    ///
    /// # Errors
    ///
    /// See [`Self::dispatch`].
    pub async fn navigate(&self, url: &Url) -> Result<DispatchOutcome, ApiError> {
        {
            let mut state = self.state();
            state.mounted = true;
            state.replace_query(url_state::read(url));
        }
        self.dispatch().await
    }

    #[must_use]
    pub fn snapshot(&self) -> SearchSnapshot {
        let state = self.state();
        SearchSnapshot {
            query: state.query.clone(),
            results: state.results.clone(),
            loading: state.loading,
            error: state.error.clone(),
            url: state.url.clone(),
            generation: state.issued,
        }
    }

    fn state(&self) -> MutexGuard<'_, SearchState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::credentials::{CredentialStore, SessionEvent};
    use crate::geo::NoLocation;

    fn orchestrator() -> SearchOrchestrator {
        let config = ClientConfig::for_api(Url::parse("http://127.0.0.1:9").unwrap());
        let api = ApiClient::new(&config, CredentialStore::new()).unwrap();
        SearchOrchestrator::new(api, &config)
    }

    #[tokio::test]
    async fn test_dispatch_without_session_is_gated() {
        let search = orchestrator();
        let mut events = search.inner.api.credentials().subscribe();
        search.set_text("pizza");

        let result = search.dispatch().await;

        assert!(matches!(result, Err(ApiError::Unauthenticated)));
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoginRequired);
        let snapshot = search.snapshot();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.generation, 0);
    }

    #[tokio::test]
    async fn test_failed_geolocation_defaults_location() {
        let search = orchestrator();
        let resolver = GeolocationResolver::new(Arc::new(NoLocation), Duration::from_secs(1));

        let result = search.use_current_location(&resolver).await;

        assert_eq!(result, Err(GeoError::Unsupported));
        assert_eq!(search.query().location_text(), Some("San Francisco, CA"));
    }

    #[tokio::test]
    async fn test_failed_geolocation_keeps_typed_location() {
        let search = orchestrator();
        search.set_location_text("Austin, TX");
        let resolver = GeolocationResolver::new(Arc::new(NoLocation), Duration::from_secs(1));

        let _ = search.use_current_location(&resolver).await;

        assert_eq!(search.query().location_text(), Some("Austin, TX"));
    }

    #[tokio::test]
    async fn test_resolved_location_switches_to_coordinates() {
        let search = orchestrator();
        search.set_location_text("Austin, TX");
        let here = Coordinates::new(30.27, -97.74).unwrap();
        let resolver = GeolocationResolver::from_position(Some(here), Duration::from_secs(1));

        search.use_current_location(&resolver).await.unwrap();

        let query = search.query();
        assert_eq!(query.coordinates(), Some(here));
        assert!(query.location_text().is_none());
    }

    struct SlowLocation(Coordinates);

    #[async_trait::async_trait]
    impl crate::geo::LocationProvider for SlowLocation {
        async fn current_location(&self) -> Result<Coordinates, GeoError> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(self.0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_typed_during_lookup_wins() {
        let search = orchestrator();
        let here = Coordinates::new(30.27, -97.74).unwrap();
        let resolver =
            GeolocationResolver::new(Arc::new(SlowLocation(here)), Duration::from_secs(1));

        let lookup = {
            let search = search.clone();
            tokio::spawn(async move { search.use_current_location(&resolver).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        search.set_location_text("Austin, TX");

        assert_eq!(lookup.await.unwrap(), Ok(here));
        let query = search.query();
        assert_eq!(query.location_text(), Some("Austin, TX"));
        assert!(query.coordinates().is_none());
    }
}
