//! Favorite restaurant endpoints.

use std::collections::HashSet;

use crowdfork_core::RestaurantId;
use tracing::instrument;

use super::types::FavoriteIdsResponse;
use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// IDs of every restaurant the signed-in user has favorited.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a session, or the
    /// backend/transport error otherwise.
    #[instrument(skip(self))]
    pub async fn favorite_ids(&self) -> Result<HashSet<RestaurantId>, ApiError> {
        let response: FavoriteIdsResponse = self
            .execute_json(
                ApiRequest::get(["users", "me", "favorites", "ids"])
                    .protected()
                    .on_failure("Failed to load favorites"),
            )
            .await?;
        Ok(response.favorite_ids.into_iter().collect())
    }

    /// Mark a restaurant as favorite.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a session, or the
    /// backend/transport error otherwise.
    #[instrument(skip(self), fields(restaurant_id = %id))]
    pub async fn add_favorite(&self, id: &RestaurantId) -> Result<(), ApiError> {
        self.execute(
            ApiRequest::post(["favorites", id.as_str()])
                .protected()
                .on_failure("Failed to add favorite"),
        )
        .await?;
        Ok(())
    }

    /// Remove a restaurant from favorites.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a session, or the
    /// backend/transport error otherwise.
    #[instrument(skip(self), fields(restaurant_id = %id))]
    pub async fn remove_favorite(&self, id: &RestaurantId) -> Result<(), ApiError> {
        self.execute(
            ApiRequest::delete(["favorites", id.as_str()])
                .protected()
                .on_failure("Failed to remove favorite"),
        )
        .await?;
        Ok(())
    }
}
