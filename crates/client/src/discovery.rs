//! The discovery session shell.
//!
//! [`DiscoverySession`] wires the components together around one shared
//! [`CredentialStore`] and exposes the operations a search page needs.
//! Navigation is left to the caller: a [`SessionWatcher`] yields the events
//! that should send the user to the login entry point.

use std::sync::Arc;

use crowdfork_core::{Coordinates, Email, RestaurantId};
use secrecy::SecretString;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::api::{ApiClient, RestaurantDetail, RestaurantSummary};
use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, SessionEvent};
use crate::error::ClientError;
use crate::favorites::FavoritesSynchronizer;
use crate::geo::{GeolocationResolver, LocationProvider};
use crate::search::{DispatchOutcome, SearchOrchestrator};
use crate::suggest::SuggestionEngine;

/// A restaurant detail page: the record plus its similar restaurants.
#[derive(Debug, Clone)]
pub struct RestaurantPage {
    pub detail: RestaurantDetail,
    pub similar: Vec<RestaurantSummary>,
}

/// The composed search-and-favorites controller.
#[derive(Debug, Clone)]
pub struct DiscoverySession {
    config: Arc<ClientConfig>,
    api: ApiClient,
    suggestions: SuggestionEngine,
    search: SearchOrchestrator,
    favorites: FavoritesSynchronizer,
    geolocation: GeolocationResolver,
}

impl DiscoverySession {
    /// Build a session whose device position comes from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let geolocation =
            GeolocationResolver::from_position(config.device_location, config.geolocation_timeout);
        Self::build(config, geolocation)
    }

    /// Build a session around a platform location provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_location_provider(
        config: ClientConfig,
        provider: Arc<dyn LocationProvider>,
    ) -> Result<Self, ClientError> {
        let geolocation = GeolocationResolver::new(provider, config.geolocation_timeout);
        Self::build(config, geolocation)
    }

    fn build(config: ClientConfig, geolocation: GeolocationResolver) -> Result<Self, ClientError> {
        let credentials = config
            .auth_token
            .clone()
            .map_or_else(CredentialStore::new, CredentialStore::with_token);
        let api = ApiClient::new(&config, credentials)?;

        Ok(Self {
            suggestions: SuggestionEngine::new(api.clone(), config.suggest_debounce),
            search: SearchOrchestrator::new(api.clone(), &config),
            favorites: FavoritesSynchronizer::new(api.clone()),
            config: Arc::new(config),
            api,
            geolocation,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        self.api.credentials()
    }

    #[must_use]
    pub const fn suggestions(&self) -> &SuggestionEngine {
        &self.suggestions
    }

    #[must_use]
    pub const fn search(&self) -> &SearchOrchestrator {
        &self.search
    }

    #[must_use]
    pub const fn favorites(&self) -> &FavoritesSynchronizer {
        &self.favorites
    }

    /// Watch for events that should redirect to the login entry point.
    #[must_use]
    pub fn watch(&self) -> SessionWatcher {
        SessionWatcher {
            events: self.credentials().subscribe(),
            favorites: self.favorites.clone(),
        }
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Sign in and load the user's favorites.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is malformed or the backend rejects the
    /// credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: SecretString) -> Result<(), ClientError> {
        let email = Email::parse(email)?;
        self.api.login(&email, &password).await?;

        if let Err(e) = self.favorites.load().await {
            warn!(error = %e, "Signed in but favorites could not be loaded");
        }
        Ok(())
    }

    /// Sign out and forget user state.
    pub fn sign_out(&self) {
        if self.api.sign_out() {
            info!("Signed out");
        }
        self.favorites.clear();
    }

    // =========================================================================
    // Search page
    // =========================================================================

    /// Open the search page at `url` and run its query.
    ///
    /// # Errors
    ///
    /// See [`SearchOrchestrator::dispatch`].
    pub async fn mount(&self, url: &Url) -> Result<DispatchOutcome, ClientError> {
        Ok(self.search.mount(url).await?)
    }

    /// The query text was edited.
    pub fn edit_text(&self, text: &str) {
        self.search.set_text(text);
        let near = self.search.query().coordinates();
        self.suggestions.input(text, near);
    }

    /// The location text was edited; leaves coordinates mode.
    pub fn edit_location(&self, location: &str) {
        self.search.set_location_text(location);
    }

    /// Run the current query.
    ///
    /// # Errors
    ///
    /// See [`SearchOrchestrator::dispatch`].
    pub async fn submit(&self) -> Result<DispatchOutcome, ClientError> {
        self.suggestions.dismiss();
        Ok(self.search.dispatch().await?)
    }

    /// Pick a suggestion: search for it right away.
    ///
    /// # Errors
    ///
    /// See [`SearchOrchestrator::dispatch`].
    pub async fn select_suggestion(&self, suggestion: &str) -> Result<DispatchOutcome, ClientError> {
        let text = self.suggestions.accept(suggestion);
        debug!(text = %text, "Suggestion selected");
        Ok(self.search.submit(text).await?)
    }

    /// Switch the query to the device position.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::LocationUnavailable`] when no position could be
    /// obtained; the query then falls back to the default city.
    pub async fn use_current_location(&self) -> Result<Coordinates, ClientError> {
        Ok(self.search.use_current_location(&self.geolocation).await?)
    }

    // =========================================================================
    // Restaurants and favorites
    // =========================================================================

    /// Detail page for a restaurant.
    ///
    /// A failing similar-restaurants lookup leaves that strip empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the restaurant itself cannot be loaded.
    #[instrument(skip(self), fields(restaurant_id = %id))]
    pub async fn restaurant(&self, id: &RestaurantId) -> Result<RestaurantPage, ClientError> {
        let (detail, similar) = tokio::join!(
            self.api.restaurant(id),
            self.api.similar_restaurants(id, self.config.similar_limit)
        );

        let similar = similar.unwrap_or_else(|e| {
            warn!(error = %e, "Similar restaurants unavailable");
            Vec::new()
        });
        Ok(RestaurantPage {
            detail: detail?,
            similar,
        })
    }

    /// Flip the favorite status of a restaurant.
    ///
    /// # Errors
    ///
    /// See [`FavoritesSynchronizer::toggle`].
    pub async fn toggle_favorite(&self, id: &RestaurantId) -> Result<bool, ClientError> {
        Ok(self.favorites.toggle(id).await?)
    }

    /// Load the details of every saved restaurant.
    ///
    /// # Errors
    ///
    /// Returns an error if the favorite IDs cannot be loaded.
    pub async fn saved_restaurants(&self) -> Result<Vec<RestaurantDetail>, ClientError> {
        self.favorites.load().await?;
        Ok(self.favorites.favorite_restaurants().await)
    }
}

/// Receives session events and reports the ones that need a login redirect.
#[derive(Debug)]
pub struct SessionWatcher {
    events: broadcast::Receiver<SessionEvent>,
    favorites: FavoritesSynchronizer,
}

impl SessionWatcher {
    /// Wait for the next event that should redirect to login.
    ///
    /// User state is cleared when the session ends. Returns `None` if the
    /// event channel closes.
    pub async fn next_redirect(&mut self) -> Option<SessionEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) => {
                    if matches!(event, SessionEvent::SessionExpired | SessionEvent::SignedOut) {
                        self.favorites.clear();
                    }
                    if event.redirects_to_login() {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Session watcher lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session(token: Option<&str>) -> DiscoverySession {
        let mut config = ClientConfig::for_api(Url::parse("http://127.0.0.1:9").unwrap());
        config.auth_token = token.map(SecretString::from);
        DiscoverySession::new(config).unwrap()
    }

    #[test]
    fn test_configured_token_is_restored() {
        assert!(session(Some("tok")).credentials().has());
        assert!(!session(None).credentials().has());
    }

    #[tokio::test]
    async fn test_watcher_reports_login_required() {
        let session = session(None);
        let mut watcher = session.watch();

        let result = session.submit().await;
        assert!(result.unwrap_err().requires_login());
        assert_eq!(
            watcher.next_redirect().await,
            Some(SessionEvent::LoginRequired)
        );
    }

    #[tokio::test]
    async fn test_sign_out_is_not_a_redirect() {
        let session = session(Some("tok"));
        let mut watcher = session.watch();

        session.sign_out();
        session.credentials().require_login();

        // SignedOut is skipped; the next redirect is the explicit one.
        assert_eq!(
            watcher.next_redirect().await,
            Some(SessionEvent::LoginRequired)
        );
        assert!(!session.credentials().has());
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_email() {
        let session = session(None);
        let result = session
            .login("not-an-email", SecretString::from("pw"))
            .await;
        assert!(matches!(result, Err(ClientError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_no_location_falls_back_to_city() {
        let session = session(Some("tok"));
        let result = session.use_current_location().await;
        assert!(matches!(result, Err(ClientError::LocationUnavailable(_))));
        assert_eq!(
            session.search().query().location_text(),
            Some("San Francisco, CA")
        );
    }
}
