//! Profile commands.

use crowdfork_client::DiscoverySession;
use crowdfork_client::api::{ProfileUpdate, UserProfile};

use crate::CliError;
use crate::output::Output;

pub async fn show(session: &DiscoverySession, out: &Output) -> Result<(), CliError> {
    let profile = session.api().profile().await?;
    out.emit(&profile, render)
}

pub async fn update(
    session: &DiscoverySession,
    out: &Output,
    update: &ProfileUpdate,
) -> Result<(), CliError> {
    let profile = session.api().update_profile(update).await?;
    out.emit(&profile, render)
}

fn render(profile: &UserProfile) -> String {
    [
        ("Name", &profile.display_name),
        ("Email", &profile.email),
        ("Location", &profile.location),
        ("Bio", &profile.bio),
        ("Avatar", &profile.avatar_url),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.as_ref().map(|v| format!("{label}: {v}")))
    .collect::<Vec<_>>()
    .join("\n")
}
