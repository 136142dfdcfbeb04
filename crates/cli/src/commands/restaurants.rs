//! Restaurant detail command.

use std::fmt::Write as _;

use crowdfork_client::hours::weekly_schedule;
use crowdfork_client::{DiscoverySession, RestaurantPage};
use crowdfork_core::{Rating, RestaurantId};
use serde_json::json;

use super::summary_line;
use crate::CliError;
use crate::output::Output;

pub async fn show(
    session: &DiscoverySession,
    out: &Output,
    id: &RestaurantId,
) -> Result<(), CliError> {
    let page = session.restaurant(id).await?;
    let favorite = session.favorites().is_favorite(id);

    let hours: Vec<_> = weekly_schedule(&page.detail.hours)
        .into_iter()
        .map(|row| json!({ "day": row.day, "hours": row.hours }))
        .collect();
    let value = json!({
        "restaurant": page.detail.summary,
        "photos": page.detail.photos,
        "phone": page.detail.display_phone,
        "price": page.detail.price,
        "hours": hours,
        "similar": page.similar,
        "favorite": favorite,
    });
    out.emit(&value, |_| render(&page, favorite))
}

fn render(page: &RestaurantPage, favorite: bool) -> String {
    let detail = &page.detail;
    let summary = &detail.summary;
    let mut text = String::new();

    let _ = writeln!(text, "{}{}", summary.name, if favorite { "  ♥" } else { "" });
    if let Some(stars) = summary.rating.and_then(|r| Rating::new(r).ok()) {
        let filled = usize::from(stars.filled_stars());
        let _ = writeln!(
            text,
            "{}{} {stars} ({} reviews)",
            "★".repeat(filled),
            "☆".repeat(5 - filled),
            summary.review_count.unwrap_or(0)
        );
    }
    for line in [&summary.category, &summary.address, &detail.display_phone, &detail.price]
        .into_iter()
        .flatten()
    {
        let _ = writeln!(text, "{line}");
    }

    let schedule = weekly_schedule(&detail.hours);
    if schedule.is_empty() {
        let _ = writeln!(text, "No hours listed");
    } else {
        for row in schedule {
            let _ = writeln!(text, "  {:<4}{}", row.day, row.hours);
        }
    }

    if !page.similar.is_empty() {
        let _ = writeln!(text, "\nSimilar:");
        for similar in &page.similar {
            let _ = writeln!(text, "  {}", summary_line(similar));
        }
    }
    text.trim_end().to_string()
}
