//! Review endpoints.

use crowdfork_core::{RestaurantId, ReviewId};
use tracing::{info, instrument};

use super::types::{CountResponse, NewReview, Review};
use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// Submit a review for `restaurant_id`.
    ///
    /// Cached data for the restaurant is dropped once the review is stored.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if the body names a different
    /// restaurant than the path, [`ApiError::Unauthenticated`] without a
    /// session, or the backend/transport error otherwise.
    #[instrument(skip(self, review), fields(restaurant_id = %restaurant_id, rating = %review.rating))]
    pub async fn create_review(
        &self,
        restaurant_id: &RestaurantId,
        review: &NewReview,
    ) -> Result<Review, ApiError> {
        if review.restaurant_id != *restaurant_id {
            return Err(ApiError::InvalidRequest(
                "Restaurant ID in path doesn't match ID in review data".to_string(),
            ));
        }

        let created: Review = self
            .execute_json(
                ApiRequest::post(["restaurants", restaurant_id.as_str(), "reviews"])
                    .protected()
                    .json(serde_json::to_value(review)?)
                    .on_failure("Failed to submit review"),
            )
            .await?;

        info!(review_id = %created.id, "Review created");
        // Rating and review count changed upstream.
        self.invalidate_restaurant(restaurant_id).await;
        Ok(created)
    }

    /// Delete one of the signed-in user's reviews.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a session, or the
    /// backend/transport error otherwise.
    #[instrument(skip(self), fields(review_id = %id))]
    pub async fn delete_review(&self, id: &ReviewId) -> Result<(), ApiError> {
        self.execute(
            ApiRequest::delete(["reviews", id.as_str()])
                .protected()
                .on_failure("Failed to delete review"),
        )
        .await?;
        Ok(())
    }

    /// Most recent reviews for a restaurant.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a session, or the
    /// backend/transport error otherwise.
    #[instrument(skip(self), fields(restaurant_id = %restaurant_id))]
    pub async fn restaurant_reviews(
        &self,
        restaurant_id: &RestaurantId,
        limit: u32,
    ) -> Result<Vec<Review>, ApiError> {
        self.execute_json(
            ApiRequest::get(["restaurant", restaurant_id.as_str(), "reviews"])
                .protected()
                .query("limit", limit)
                .on_failure("Failed to load reviews"),
        )
        .await
    }

    /// Reviews written by the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a session, or the
    /// backend/transport error otherwise.
    #[instrument(skip(self))]
    pub async fn my_reviews(&self, limit: u32) -> Result<Vec<Review>, ApiError> {
        self.execute_json(
            ApiRequest::get(["users", "me", "reviews"])
                .protected()
                .query("limit", limit)
                .on_failure("Failed to load your reviews"),
        )
        .await
    }

    /// Number of reviews written by the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a session, or the
    /// backend/transport error otherwise.
    #[instrument(skip(self))]
    pub async fn my_review_count(&self) -> Result<u64, ApiError> {
        let response: CountResponse = self
            .execute_json(
                ApiRequest::get(["users", "me", "reviews", "count"])
                    .protected()
                    .on_failure("Failed to load review count"),
            )
            .await?;
        Ok(response.count)
    }
}
