//! Restaurant search, listing, autocomplete and detail lookups.

use crowdfork_core::{Coordinates, RestaurantId};
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    AutocompleteResponse, LocationBias, RestaurantDetail, RestaurantSummary, SearchParams,
    SearchResponse,
};
use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// Free-text search centred on a location or device coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a session, or the
    /// backend/transport error otherwise.
    #[instrument(skip(self, params), fields(term = %params.term))]
    pub async fn search(&self, params: &SearchParams) -> Result<Vec<RestaurantSummary>, ApiError> {
        let mut request = ApiRequest::get(["search", "restaurants"])
            .protected()
            .query("term", &params.term);

        request = match &params.bias {
            LocationBias::Text(location) => request.query("location", location),
            LocationBias::Coordinates(coords) => request
                .query("latitude", coords.lat())
                .query("longitude", coords.lon()),
        };
        if let Some(limit) = params.limit {
            request = request.query("limit", limit);
        }

        let response: SearchResponse = self.execute_json(request.on_failure("Search failed")).await?;
        let restaurants = response.into_restaurants();
        debug!(count = restaurants.len(), "Search returned results");
        Ok(restaurants)
    }

    /// Default feed shown when there is no query text.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a session, or the
    /// backend/transport error otherwise.
    #[instrument(skip(self))]
    pub async fn list_restaurants(
        &self,
        limit: u32,
        cuisine_type: Option<&str>,
    ) -> Result<Vec<RestaurantSummary>, ApiError> {
        let mut request = ApiRequest::get(["restaurants"])
            .protected()
            .query("limit", limit);
        if let Some(cuisine) = cuisine_type.filter(|c| !c.trim().is_empty()) {
            request = request.query("cuisine_type", cuisine);
        }

        let response: SearchResponse = self
            .execute_json(request.on_failure("Failed to load restaurants"))
            .await?;
        Ok(response.into_restaurants())
    }

    /// Autocomplete candidates for partially typed text.
    ///
    /// Blank text yields an empty list without a network call.
    ///
    /// # Errors
    ///
    /// Returns the backend/transport error.
    #[instrument(skip(self))]
    pub async fn autocomplete(
        &self,
        text: &str,
        near: Option<Coordinates>,
    ) -> Result<Vec<String>, ApiError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = ApiRequest::get(["autocomplete", "restaurants"]).query("text", text);
        if let Some(coords) = near {
            request = request
                .query("latitude", coords.lat())
                .query("longitude", coords.lon());
        }

        let response: AutocompleteResponse = self
            .execute_json(request.on_failure("Failed to fetch suggestions"))
            .await?;
        Ok(response.into_terms())
    }

    /// Full restaurant record, cached for five minutes.
    ///
    /// # Errors
    ///
    /// Returns the backend/transport error; a missing restaurant surfaces as
    /// [`ApiError::RequestFailed`] with status 404.
    #[instrument(skip(self), fields(restaurant_id = %id))]
    pub async fn restaurant(&self, id: &RestaurantId) -> Result<RestaurantDetail, ApiError> {
        let cache_key = CacheKey::Restaurant(id.clone());

        if let Some(CacheValue::Restaurant(detail)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for restaurant");
            return Ok(*detail);
        }

        let detail: RestaurantDetail = self
            .execute_json(
                ApiRequest::get(["yelp", "restaurants", id.as_str()])
                    .on_failure("Failed to load restaurant"),
            )
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Restaurant(Box::new(detail.clone())))
            .await;

        Ok(detail)
    }

    /// Restaurants similar to `id`, cached per limit.
    ///
    /// # Errors
    ///
    /// Returns the backend/transport error.
    #[instrument(skip(self), fields(restaurant_id = %id))]
    pub async fn similar_restaurants(
        &self,
        id: &RestaurantId,
        limit: u32,
    ) -> Result<Vec<RestaurantSummary>, ApiError> {
        let cache_key = CacheKey::Similar {
            id: id.clone(),
            limit,
        };

        if let Some(CacheValue::Similar(list)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for similar restaurants");
            return Ok(list);
        }

        let response: SearchResponse = self
            .execute_json(
                ApiRequest::get(["yelp", "restaurants", id.as_str(), "similar"])
                    .query("limit", limit)
                    .on_failure("Failed to load similar restaurants"),
            )
            .await?;
        let list = response.into_restaurants();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Similar(list.clone()))
            .await;

        Ok(list)
    }

    /// Drop every cached entry for a restaurant.
    pub async fn invalidate_restaurant(&self, id: &RestaurantId) {
        self.inner
            .cache
            .invalidate(&CacheKey::Restaurant(id.clone()))
            .await;

        let target = id.clone();
        if let Err(e) = self.inner.cache.invalidate_entries_if(move |key, _| {
            matches!(key, CacheKey::Similar { id, .. } if *id == target)
        }) {
            debug!(error = %e, "Could not schedule similar-restaurant invalidation");
        }
    }

    /// Drop all cached restaurant data.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
    }
}
