//! CLI command implementations.

pub mod account;
pub mod favorites;
pub mod profile;
pub mod restaurants;
pub mod reviews;
pub mod search;

use crowdfork_client::api::RestaurantSummary;

/// One-line rendering of a restaurant for lists.
pub(crate) fn summary_line(restaurant: &RestaurantSummary) -> String {
    let mut line = format!("{}  {}", restaurant.id, restaurant.name);
    if let Some(rating) = restaurant.rating {
        line.push_str(&format!("  ★ {rating:.1}"));
    }
    if let Some(category) = &restaurant.category {
        line.push_str(&format!("  [{category}]"));
    }
    if let Some(address) = &restaurant.address {
        line.push_str(&format!("  {address}"));
    }
    line
}

pub(crate) fn summary_lines(restaurants: &[RestaurantSummary]) -> String {
    if restaurants.is_empty() {
        return "No restaurants found".to_string();
    }
    restaurants
        .iter()
        .map(summary_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line_skips_missing_fields() {
        let restaurant: RestaurantSummary =
            serde_json::from_str(r#"{"id": "r1", "name": "Joe's", "cuisine_type": "Pizza"}"#)
                .unwrap();
        assert_eq!(summary_line(&restaurant), "r1  Joe's  [Pizza]");
    }

    #[test]
    fn test_summary_lines_empty() {
        assert_eq!(summary_lines(&[]), "No restaurants found");
    }
}
