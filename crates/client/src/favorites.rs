//! Favorite restaurants with optimistic updates.
//!
//! A toggle flips local membership first and confirms with the backend
//! second; a failed confirmation rolls the flip back. Toggles of the same
//! restaurant wait in FIFO order behind a per-restaurant gate, so the
//! backend always sees them in the order the user made them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crowdfork_core::RestaurantId;
use futures::future::join_all;
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::api::{ApiClient, ApiError, RestaurantDetail};

/// Point-in-time view of the favorite set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FavoritesSnapshot {
    pub ids: HashSet<RestaurantId>,
    pub loaded: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct FavoritesState {
    ids: HashSet<RestaurantId>,
    loaded: bool,
    error: Option<String>,
}

type Gate = Arc<tokio::sync::Mutex<()>>;

struct FavoritesInner {
    api: ApiClient,
    state: Mutex<FavoritesState>,
    gates: Mutex<HashMap<RestaurantId, Gate>>,
}

/// Mirrors the signed-in user's favorite restaurant IDs.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct FavoritesSynchronizer {
    inner: Arc<FavoritesInner>,
}

impl std::fmt::Debug for FavoritesSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesSynchronizer")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl FavoritesSynchronizer {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(FavoritesInner {
                api,
                state: Mutex::new(FavoritesState::default()),
                gates: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Replace the local set with the backend's.
    ///
    /// On a backend failure the set is left empty and the error is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a session, or the
    /// backend/transport error otherwise.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<usize, ApiError> {
        self.require_session()?;

        match self.inner.api.favorite_ids().await {
            Ok(ids) => {
                let count = ids.len();
                let mut state = self.state();
                state.ids = ids;
                state.loaded = true;
                state.error = None;
                debug!(count, "Loaded favorites");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load favorites");
                let mut state = self.state();
                state.ids.clear();
                state.loaded = false;
                state.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Flip the favorite status of `id`. Returns the confirmed new status.
    ///
    /// The flip is visible through [`Self::is_favorite`] as soon as this
    /// toggle reaches the front of the queue for `id`. Once flipped, the
    /// confirmation runs to completion on its own task, so dropping the
    /// returned future never leaves an unconfirmed flip behind.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a session. Any backend
    /// error rolls the flip back, records a message and is returned.
    #[instrument(skip(self), fields(restaurant_id = %id))]
    pub async fn toggle(&self, id: &RestaurantId) -> Result<bool, ApiError> {
        self.require_session()?;

        let gate = self.gate(id);
        let permit = Arc::clone(&gate).lock_owned().await;
        let favorite = self.flip(id);

        let synchronizer = self.clone();
        let id = id.clone();
        let confirmation = tokio::spawn(
            async move {
                let result = synchronizer.confirm(&id, favorite).await;
                drop(permit);
                synchronizer.release_gate(&id, gate);
                result
            }
            .in_current_span(),
        );

        confirmation.await.unwrap_or_else(|e| {
            if e.is_panic() {
                std::panic::resume_unwind(e.into_panic());
            }
            error!(error = %e, "Favorite confirmation task was cancelled");
            Err(ApiError::Interrupted)
        })
    }

    /// Optimistically flip membership. Returns the new status.
    fn flip(&self, id: &RestaurantId) -> bool {
        let mut state = self.state();
        state.error = None;
        if state.ids.remove(id) {
            false
        } else {
            state.ids.insert(id.clone());
            true
        }
    }

    /// Confirm a flip with the backend, rolling it back on failure.
    async fn confirm(&self, id: &RestaurantId, favorite: bool) -> Result<bool, ApiError> {
        let confirmed = if favorite {
            self.inner.api.add_favorite(id).await
        } else {
            self.inner.api.remove_favorite(id).await
        };

        match confirmed {
            Ok(()) => {
                info!(favorite, "Favorite status confirmed");
                Ok(favorite)
            }
            Err(e) => {
                warn!(favorite, error = %e, "Favorite update rejected, rolling back");
                let mut state = self.state();
                if favorite {
                    state.ids.remove(id);
                } else {
                    state.ids.insert(id.clone());
                }
                state.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    #[must_use]
    pub fn is_favorite(&self, id: &RestaurantId) -> bool {
        self.state().ids.contains(id)
    }

    #[must_use]
    pub fn snapshot(&self) -> FavoritesSnapshot {
        let state = self.state();
        FavoritesSnapshot {
            ids: state.ids.clone(),
            loaded: state.loaded,
            error: state.error.clone(),
        }
    }

    /// Forget everything, e.g. after sign-out.
    pub fn clear(&self) {
        *self.state() = FavoritesState::default();
    }

    /// Details for every favorite, fetched concurrently.
    ///
    /// Restaurants whose details cannot be loaded are skipped. Results are
    /// ordered by ID.
    #[instrument(skip(self))]
    pub async fn favorite_restaurants(&self) -> Vec<RestaurantDetail> {
        let mut ids: Vec<RestaurantId> = self.state().ids.iter().cloned().collect();
        ids.sort();

        let lookups = ids.iter().map(|id| self.inner.api.restaurant(id));
        join_all(lookups)
            .await
            .into_iter()
            .zip(&ids)
            .filter_map(|(result, id)| match result {
                Ok(detail) => Some(detail),
                Err(e) => {
                    warn!(restaurant_id = %id, error = %e, "Skipping favorite without details");
                    None
                }
            })
            .collect()
    }

    fn require_session(&self) -> Result<(), ApiError> {
        let credentials = self.inner.api.credentials();
        if credentials.has() {
            Ok(())
        } else {
            credentials.require_login();
            Err(ApiError::Unauthenticated)
        }
    }

    fn gate(&self, id: &RestaurantId) -> Gate {
        let mut gates = self.gates();
        Arc::clone(gates.entry(id.clone()).or_default())
    }

    /// Drop the gate for `id` once nobody else is queued on it.
    fn release_gate(&self, id: &RestaurantId, gate: Gate) {
        let mut gates = self.gates();
        // One reference in the map and ours.
        if Arc::strong_count(&gate) == 2 {
            gates.remove(id);
        }
    }

    fn state(&self) -> MutexGuard<'_, FavoritesState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn gates(&self) -> MutexGuard<'_, HashMap<RestaurantId, Gate>> {
        self.inner
            .gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::config::ClientConfig;
    use crate::credentials::{CredentialStore, SessionEvent};

    fn favorites() -> FavoritesSynchronizer {
        let config = ClientConfig::for_api(Url::parse("http://127.0.0.1:9").unwrap());
        let api = ApiClient::new(&config, CredentialStore::new()).unwrap();
        FavoritesSynchronizer::new(api)
    }

    #[tokio::test]
    async fn test_toggle_without_session_changes_nothing() {
        let favorites = favorites();
        let mut events = favorites.inner.api.credentials().subscribe();
        let id = RestaurantId::new("biz123");

        let result = favorites.toggle(&id).await;

        assert!(matches!(result, Err(ApiError::Unauthenticated)));
        assert!(!favorites.is_favorite(&id));
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoginRequired);
        assert!(favorites.gates().is_empty());
    }

    #[tokio::test]
    async fn test_load_without_session() {
        let favorites = favorites();
        assert!(matches!(favorites.load().await, Err(ApiError::Unauthenticated)));
        assert!(!favorites.snapshot().loaded);
    }

    #[test]
    fn test_gate_is_shared_and_released() {
        let favorites = favorites();
        let id = RestaurantId::new("biz123");

        let first = favorites.gate(&id);
        let second = favorites.gate(&id);
        assert!(Arc::ptr_eq(&first, &second));

        favorites.release_gate(&id, first);
        assert_eq!(favorites.gates().len(), 1);

        favorites.release_gate(&id, second);
        assert!(favorites.gates().is_empty());
    }

    #[tokio::test]
    async fn test_favorite_restaurants_empty() {
        assert!(favorites().favorite_restaurants().await.is_empty());
    }
}
