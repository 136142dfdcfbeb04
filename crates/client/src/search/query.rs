//! The authoritative search query.

use crowdfork_core::Coordinates;

use crate::api::{LocationBias, SearchParams};

/// What the user is searching for and where.
///
/// At most one of `location_text` and `coordinates` is set; each setter
/// clears the other so the most recent user action wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    text: String,
    location_text: Option<String>,
    coordinates: Option<Coordinates>,
}

/// The request a query resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchRequest {
    /// Free-text search.
    Search(SearchParams),
    /// Default feed.
    Listing { limit: u32 },
}

impl Query {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn location_text(&self) -> Option<&str> {
        self.location_text.as_deref()
    }

    #[must_use]
    pub const fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Set a typed location. Leaves coordinates mode; blank text unsets both.
    pub fn set_location_text(&mut self, location: impl Into<String>) {
        let location = location.into();
        self.coordinates = None;
        self.location_text = (!location.trim().is_empty()).then_some(location);
    }

    /// Switch to coordinates mode.
    pub fn set_coordinates(&mut self, coordinates: Coordinates) {
        self.coordinates = Some(coordinates);
        self.location_text = None;
    }

    /// Whether neither a location nor coordinates are known.
    #[must_use]
    pub const fn has_no_location(&self) -> bool {
        self.location_text.is_none() && self.coordinates.is_none()
    }

    /// Where a search should be centred, falling back to `fallback_city`.
    #[must_use]
    pub fn bias(&self, fallback_city: &str) -> LocationBias {
        match (&self.coordinates, &self.location_text) {
            (Some(coords), _) => LocationBias::Coordinates(*coords),
            (None, Some(location)) => LocationBias::Text(location.trim().to_string()),
            (None, None) => LocationBias::Text(fallback_city.to_string()),
        }
    }

    /// Non-empty text searches; empty text lists the default feed.
    #[must_use]
    pub fn to_request(&self, fallback_city: &str, listing_limit: u32) -> SearchRequest {
        let term = self.text.trim();
        if term.is_empty() {
            SearchRequest::Listing {
                limit: listing_limit,
            }
        } else {
            SearchRequest::Search(SearchParams {
                term: term.to_string(),
                bias: self.bias(fallback_city),
                limit: None,
            })
        }
    }
}
