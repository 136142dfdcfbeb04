//! Favorites commands.

use crowdfork_client::DiscoverySession;
use crowdfork_core::RestaurantId;

use super::summary_lines;
use crate::CliError;
use crate::output::Output;

/// List saved restaurants with their details.
pub async fn list(session: &DiscoverySession, out: &Output) -> Result<(), CliError> {
    let saved = session.saved_restaurants().await?;
    let summaries: Vec<_> = saved.into_iter().map(|detail| detail.summary).collect();
    out.emit(&summaries, |list| summary_lines(list))
}

/// Flip a restaurant's favorite status.
pub async fn toggle(
    session: &DiscoverySession,
    out: &Output,
    id: &RestaurantId,
) -> Result<(), CliError> {
    if let Err(e) = session.favorites().load().await {
        tracing::warn!(error = %e, "Toggling without the current favorite list");
    }
    let favorite = session.toggle_favorite(id).await?;

    out.emit(
        &serde_json::json!({ "id": id, "favorite": favorite }),
        |_| {
            if favorite {
                format!("Added {id} to favorites")
            } else {
                format!("Removed {id} from favorites")
            }
        },
    )
}
