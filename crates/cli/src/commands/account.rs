//! Account commands.

use crowdfork_client::DiscoverySession;
use crowdfork_core::Email;
use secrecy::{ExposeSecret, SecretString};

use crate::CliError;
use crate::output::Output;

/// Sign in and print the token for `CROWDFORK_AUTH_TOKEN`.
pub async fn login(
    session: &DiscoverySession,
    out: &Output,
    email: &str,
    password: String,
    token_only: bool,
) -> Result<(), CliError> {
    session.login(email, SecretString::from(password)).await?;

    let Some(token) = session.credentials().get() else {
        return out.message("Signed in, but no token was stored");
    };

    if token_only {
        out.emit(token.expose_secret(), |t| t.to_string())
    } else {
        let favorites = session.favorites().snapshot().ids.len();
        tracing::info!(favorites, "Signed in");
        out.emit(
            &serde_json::json!({ "token": token.expose_secret(), "favorites": favorites }),
            |_| format!("export CROWDFORK_AUTH_TOKEN={}", token.expose_secret()),
        )
    }
}

/// Create an account.
pub async fn signup(
    session: &DiscoverySession,
    out: &Output,
    email: &str,
    password: String,
) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(crowdfork_client::ClientError::from)?;
    let message = session
        .api()
        .signup(&email, &SecretString::from(password))
        .await?;

    if message.is_empty() {
        out.message("Account created")
    } else {
        out.message(&message)
    }
}
