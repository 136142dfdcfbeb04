//! Wire types for the CrowdFork REST API.
//!
//! The backend proxies two upstream shapes: restaurants stored locally
//! (`cuisine_type`, flat `address`) and upstream business records
//! (`categories`, nested `location`). [`RestaurantSummary`] accepts both.

use chrono::NaiveDateTime;
use crowdfork_core::{Coordinates, Rating, RestaurantId, ReviewId, UserId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Restaurants
// =============================================================================

/// A restaurant as shown in result lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBusiness")]
pub struct RestaurantSummary {
    pub id: RestaurantId,
    pub name: String,
    pub category: Option<String>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub image_url: Option<String>,
    pub review_count: Option<u32>,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CategoryTag {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawLocation {
    #[serde(default)]
    pub display_address: Vec<String>,
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawCoordinates {
    #[serde(default, alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lon")]
    pub longitude: Option<f64>,
}

impl RawCoordinates {
    fn validated(&self) -> Option<Coordinates> {
        Coordinates::new(self.latitude?, self.longitude?).ok()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBusiness {
    id: RestaurantId,
    name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    cuisine_type: Option<String>,
    #[serde(default)]
    categories: Vec<CategoryTag>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    location: Option<RawLocation>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    review_count: Option<u32>,
    #[serde(default)]
    coordinates: Option<RawCoordinates>,
}

impl From<RawBusiness> for RestaurantSummary {
    fn from(raw: RawBusiness) -> Self {
        let category = raw
            .category
            .or(raw.cuisine_type)
            .or_else(|| first_category_title(&raw.categories));
        let address = raw
            .address
            .or_else(|| raw.location.as_ref().and_then(format_location));

        Self {
            id: raw.id,
            name: raw.name,
            category,
            address,
            rating: raw.rating,
            image_url: raw.image_url.filter(|url| !url.is_empty()),
            review_count: raw.review_count,
            coordinates: raw.coordinates.as_ref().and_then(RawCoordinates::validated),
        }
    }
}

fn first_category_title(categories: &[CategoryTag]) -> Option<String> {
    categories
        .iter()
        .find_map(|c| c.title.clone().or_else(|| c.alias.clone()))
}

fn format_location(location: &RawLocation) -> Option<String> {
    if !location.display_address.is_empty() {
        return Some(location.display_address.join(", "));
    }
    match (&location.address1, &location.city) {
        (Some(street), Some(city)) if !street.is_empty() => Some(format!("{street}, {city}")),
        (Some(street), _) if !street.is_empty() => Some(street.clone()),
        (_, Some(city)) => Some(city.clone()),
        _ => None,
    }
}

/// Search responses arrive either as a bare list or wrapped like the upstream API.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SearchResponse {
    List(Vec<RestaurantSummary>),
    Wrapped { businesses: Vec<RestaurantSummary> },
}

impl SearchResponse {
    pub(crate) fn into_restaurants(self) -> Vec<RestaurantSummary> {
        match self {
            Self::List(list) | Self::Wrapped { businesses: list } => list,
        }
    }
}

/// Where a search is centred.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationBias {
    /// Free-text location such as a city or neighbourhood.
    Text(String),
    /// Device coordinates.
    Coordinates(Coordinates),
}

/// Parameters for a text search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub term: String,
    pub bias: LocationBias,
    pub limit: Option<u32>,
}

/// Weekly opening slot as reported upstream (`day` 0 = Monday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSlot {
    pub day: u8,
    /// `HHMM`, 24-hour clock.
    pub start: String,
    /// `HHMM`, 24-hour clock.
    pub end: String,
    #[serde(default)]
    pub is_overnight: bool,
}

/// Opening hours block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hours {
    #[serde(default)]
    pub open: Vec<OpenSlot>,
    #[serde(default)]
    pub is_open_now: bool,
}

/// Full restaurant record for the detail view.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RestaurantDetail {
    #[serde(flatten)]
    pub summary: RestaurantSummary,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub display_phone: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hours: Vec<Hours>,
    #[serde(default)]
    pub is_closed: bool,
}

// =============================================================================
// Suggestions
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct TermEntry {
    pub text: String,
}

/// Autocomplete responses arrive as bare strings or upstream `terms` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AutocompleteResponse {
    Plain(Vec<String>),
    Terms { terms: Vec<TermEntry> },
}

impl AutocompleteResponse {
    pub(crate) fn into_terms(self) -> Vec<String> {
        match self {
            Self::Plain(terms) => terms,
            Self::Terms { terms } => terms.into_iter().map(|t| t.text).collect(),
        }
    }
}

// =============================================================================
// Favorites
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct FavoriteIdsResponse {
    #[serde(default)]
    pub favorite_ids: Vec<RestaurantId>,
}

// =============================================================================
// Reviews
// =============================================================================

/// A review as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub restaurant_id: RestaurantId,
    pub user_id: UserId,
    pub rating: f64,
    #[serde(default)]
    pub text: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Body of a review submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReview {
    pub restaurant_id: RestaurantId,
    pub rating: Rating,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountResponse {
    pub count: u64,
}

// =============================================================================
// Account
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// The signed-in user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, alias = "user_id", alias = "uid")]
    pub id: Option<UserId>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "name")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "avatar")]
    pub avatar_url: Option<String>,
}

/// Partial profile update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    /// Whether the update would change anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.bio.is_none()
            && self.location.is_none()
            && self.avatar_url.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_local_restaurant() {
        let json = r#"{
            "id": "r1",
            "name": "Joe's Pizza",
            "address": "123 Main St, New York, NY",
            "cuisine_type": "Italian",
            "created_at": "2024-01-01T00:00:00",
            "updated_at": "2024-01-01T00:00:00"
        }"#;
        let summary: RestaurantSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.id.as_str(), "r1");
        assert_eq!(summary.category.as_deref(), Some("Italian"));
        assert_eq!(summary.address.as_deref(), Some("123 Main St, New York, NY"));
        assert!(summary.rating.is_none());
    }

    #[test]
    fn test_summary_from_upstream_business() {
        let json = r#"{
            "id": "biz123",
            "name": "Golden Boy",
            "image_url": "",
            "rating": 4.5,
            "review_count": 120,
            "categories": [{"alias": "pizza", "title": "Pizza"}],
            "location": {"display_address": ["542 Green St", "San Francisco, CA 94133"]},
            "coordinates": {"latitude": 37.8, "longitude": -122.41}
        }"#;
        let summary: RestaurantSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.category.as_deref(), Some("Pizza"));
        assert_eq!(
            summary.address.as_deref(),
            Some("542 Green St, San Francisco, CA 94133")
        );
        assert!(summary.image_url.is_none());
        assert!(summary.coordinates.is_some());
    }

    #[test]
    fn test_summary_tolerates_null_coordinates() {
        let json = r#"{"id": "x", "name": "X", "coordinates": {"latitude": null, "longitude": null}}"#;
        let summary: RestaurantSummary = serde_json::from_str(json).unwrap();
        assert!(summary.coordinates.is_none());
    }

    #[test]
    fn test_summary_survives_reserialization() {
        let json = r#"{"id": "x", "name": "X", "category": "Thai", "address": "1 Road"}"#;
        let summary: RestaurantSummary = serde_json::from_str(json).unwrap();
        let again: RestaurantSummary =
            serde_json::from_str(&serde_json::to_string(&summary).unwrap()).unwrap();
        assert_eq!(summary, again);
    }

    #[test]
    fn test_search_response_both_shapes() {
        let wrapped: SearchResponse =
            serde_json::from_str(r#"{"businesses": [{"id": "a", "name": "A"}], "total": 1}"#)
                .unwrap();
        assert_eq!(wrapped.into_restaurants().len(), 1);

        let list: SearchResponse = serde_json::from_str(r#"[{"id": "a", "name": "A"}]"#).unwrap();
        assert_eq!(list.into_restaurants().len(), 1);
    }

    #[test]
    fn test_autocomplete_both_shapes() {
        let plain: AutocompleteResponse = serde_json::from_str(r#"["pizza", "pizzeria"]"#).unwrap();
        assert_eq!(plain.into_terms(), vec!["pizza", "pizzeria"]);

        let terms: AutocompleteResponse =
            serde_json::from_str(r#"{"terms": [{"text": "pizza"}], "businesses": []}"#).unwrap();
        assert_eq!(terms.into_terms(), vec!["pizza"]);
    }

    #[test]
    fn test_detail_flattens_summary() {
        let json = r#"{
            "id": "biz123",
            "name": "Golden Boy",
            "photos": ["a.jpg", "b.jpg"],
            "hours": [{"open": [{"day": 0, "start": "1100", "end": "2100"}], "is_open_now": true}]
        }"#;
        let detail: RestaurantDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.summary.name, "Golden Boy");
        assert_eq!(detail.photos.len(), 2);
        assert_eq!(detail.hours[0].open[0].start, "1100");
    }

    #[test]
    fn test_review_parses_naive_timestamp() {
        let json = r#"{
            "id": "rev1",
            "restaurant_id": "biz123",
            "user_id": "uid1",
            "rating": 4.5,
            "text": "Great",
            "created_at": "2024-06-15T12:30:45.123456"
        }"#;
        let review: Review = serde_json::from_str(json).unwrap();
        assert_eq!(review.created_at.date().to_string(), "2024-06-15");
    }

    #[test]
    fn test_new_review_serializes_rating_as_number() {
        let review = NewReview {
            restaurant_id: RestaurantId::new("biz123"),
            rating: Rating::new(4.0).unwrap(),
            text: None,
        };
        let value = serde_json::to_value(&review).unwrap();
        assert_eq!(value["rating"], serde_json::json!(4.0));
        assert!(value.get("text").is_none());
    }

    #[test]
    fn test_profile_update_skips_absent_fields() {
        let update = ProfileUpdate {
            bio: Some("Taco hunter".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(!update.is_empty());
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, serde_json::json!({"bio": "Taco hunter"}));
    }
}
