//! Review commands.

use crowdfork_client::api::{NewReview, Review};
use crowdfork_client::{ClientError, DiscoverySession};
use crowdfork_core::{Rating, RestaurantId, ReviewId};

use crate::CliError;
use crate::output::Output;

pub async fn create(
    session: &DiscoverySession,
    out: &Output,
    restaurant_id: &RestaurantId,
    rating: f64,
    text: Option<String>,
) -> Result<(), CliError> {
    let review = NewReview {
        restaurant_id: restaurant_id.clone(),
        rating: Rating::new(rating).map_err(ClientError::from)?,
        text: text.filter(|t| !t.trim().is_empty()),
    };
    let created = session.api().create_review(restaurant_id, &review).await?;
    out.emit(&created, |r| format!("Review {} created", r.id))
}

pub async fn list(
    session: &DiscoverySession,
    out: &Output,
    restaurant: Option<RestaurantId>,
    limit: u32,
) -> Result<(), CliError> {
    let reviews = match &restaurant {
        Some(id) => session.api().restaurant_reviews(id, limit).await?,
        None => session.api().my_reviews(limit).await?,
    };
    out.emit(&reviews, |reviews| render(reviews))
}

pub async fn delete(
    session: &DiscoverySession,
    out: &Output,
    id: &ReviewId,
) -> Result<(), CliError> {
    session.api().delete_review(id).await?;
    out.message(&format!("Review {id} deleted"))
}

pub async fn count(session: &DiscoverySession, out: &Output) -> Result<(), CliError> {
    let count = session.api().my_review_count().await?;
    out.emit(&serde_json::json!({ "count": count }), |_| {
        format!("{count} reviews")
    })
}

fn render(reviews: &[Review]) -> String {
    if reviews.is_empty() {
        return "No reviews yet".to_string();
    }
    reviews
        .iter()
        .map(|r| {
            format!(
                "{}  {}  ★ {:.1}  {}  {}",
                r.created_at.format("%Y-%m-%d"),
                r.restaurant_id,
                r.rating,
                r.id,
                r.text.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
