//! Cache types for restaurant lookups.
//!
//! Detail pages and their "similar restaurants" strip are immutable enough to
//! cache; searches, favorites and reviews are never cached.

use crowdfork_core::RestaurantId;

use super::types::{RestaurantDetail, RestaurantSummary};

/// Cache key for restaurant lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Restaurant(RestaurantId),
    Similar { id: RestaurantId, limit: u32 },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Restaurant(Box<RestaurantDetail>),
    Similar(Vec<RestaurantSummary>),
}
