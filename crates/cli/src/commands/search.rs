//! Search and autocomplete commands.

use std::time::Duration;

use crowdfork_client::{DiscoverySession, DispatchOutcome, SuggestionPhase};
use url::Url;

use super::summary_lines;
use crate::CliError;
use crate::output::Output;

const SUGGEST_POLL: Duration = Duration::from_millis(25);

pub struct SearchArgs {
    pub term: Option<String>,
    pub location: Option<String>,
    pub near_me: bool,
    pub url: Option<Url>,
}

/// Run a search (or replay a shareable URL) and print the results.
pub async fn search(
    session: &DiscoverySession,
    out: &Output,
    args: SearchArgs,
) -> Result<(), CliError> {
    let outcome = if let Some(url) = args.url {
        session.mount(&url).await?
    } else {
        if args.near_me {
            if let Err(e) = session.use_current_location().await {
                tracing::warn!(error = %e, "Searching without device position");
            }
        } else if let Some(location) = &args.location {
            session.edit_location(location);
        }
        session.search().set_text(args.term.unwrap_or_default());
        session.submit().await?
    };

    if outcome == DispatchOutcome::Stale {
        return Ok(());
    }

    let snapshot = session.search().snapshot();
    tracing::info!(url = %snapshot.url, "Shareable search link");
    out.emit(&snapshot.results, |results| summary_lines(results))
}

/// Print autocomplete candidates for `text`, going through the debounce.
pub async fn suggest(
    session: &DiscoverySession,
    out: &Output,
    text: &str,
    near_me: bool,
) -> Result<(), CliError> {
    if near_me && let Err(e) = session.use_current_location().await {
        tracing::warn!(error = %e, "Suggesting without device position");
    }

    session.edit_text(text);

    let config = session.config();
    let deadline = config.suggest_debounce + config.request_timeout;
    let settled = tokio::time::timeout(deadline, async {
        while session.suggestions().snapshot().phase == SuggestionPhase::Pending {
            tokio::time::sleep(SUGGEST_POLL).await;
        }
    })
    .await;
    if settled.is_err() {
        tracing::warn!("Timed out waiting for suggestions");
    }

    let snapshot = session.suggestions().snapshot();
    if snapshot.phase == SuggestionPhase::Failed {
        return out.message("Suggestions are unavailable right now");
    }
    out.emit(&snapshot.suggestions, |suggestions| suggestions.join("\n"))
}
