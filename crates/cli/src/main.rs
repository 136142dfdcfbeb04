//! CrowdFork CLI - Restaurant discovery from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in and keep the token for later commands
//! export CROWDFORK_AUTH_TOKEN=$(crowdfork login -e me@example.com --token-only)
//!
//! # Search near a city, or near the configured device position
//! crowdfork search "pad thai" --location "Oakland, CA"
//! crowdfork search tacos --near-me
//!
//! # Autocomplete
//! crowdfork suggest piz
//!
//! # Favorites and reviews
//! crowdfork favorites toggle biz123
//! crowdfork review create biz123 --rating 4.5 --text "Great crust"
//! ```
//!
//! # Commands
//!
//! - `login` / `signup` - Account access
//! - `search` - Search or list restaurants
//! - `suggest` - Autocomplete candidates
//! - `restaurant` - Detail page with similar restaurants
//! - `favorites list|toggle` - Saved restaurants
//! - `review create|list|delete|count` - Reviews
//! - `profile show|update` - Current user profile

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use crowdfork_client::{ClientConfig, ClientError, DiscoverySession};
use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "crowdfork")]
#[command(author, version, about = "CrowdFork restaurant discovery CLI")]
struct Cli {
    /// Backend base URL (overrides `CROWDFORK_API_URL`)
    #[arg(long, global = true)]
    api_url: Option<url::Url>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and print the session token
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "CROWDFORK_PASSWORD", hide_env_values = true)]
        password: String,

        /// Print only the token
        #[arg(long)]
        token_only: bool,
    },
    /// Create an account
    Signup {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "CROWDFORK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Search restaurants; without a term, list the default feed
    Search {
        /// What to search for
        term: Option<String>,

        /// City or neighbourhood
        #[arg(short, long, conflicts_with = "near_me")]
        location: Option<String>,

        /// Search around the device position
        #[arg(long)]
        near_me: bool,

        /// Shareable search URL to replay instead of a term
        #[arg(long, conflicts_with_all = ["term", "location", "near_me"])]
        url: Option<url::Url>,
    },
    /// Autocomplete a partial query
    Suggest {
        text: String,

        /// Bias towards the device position
        #[arg(long)]
        near_me: bool,
    },
    /// Show a restaurant with similar places
    Restaurant { id: String },
    /// Manage favorite restaurants
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Manage reviews
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },
    /// Show or update the current profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List saved restaurants with details
    List,
    /// Add or remove a restaurant
    Toggle { id: String },
}

#[derive(Subcommand)]
enum ReviewAction {
    /// Review a restaurant
    Create {
        restaurant_id: String,

        /// Stars, 0 to 5
        #[arg(short, long)]
        rating: f64,

        #[arg(short, long)]
        text: Option<String>,
    },
    /// List reviews for a restaurant, or your own
    List {
        /// Restaurant to list reviews for (default: yours)
        #[arg(long)]
        restaurant: Option<String>,

        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },
    /// Delete one of your reviews
    Delete { id: String },
    /// Count your reviews
    Count,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the current profile
    Show,
    /// Update profile fields
    Update {
        #[arg(long)]
        display_name: Option<String>,

        #[arg(long)]
        bio: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        avatar_url: Option<String>,
    },
}

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

impl From<crowdfork_client::ApiError> for CliError {
    fn from(e: crowdfork_client::ApiError) -> Self {
        Self::Client(e.into())
    }
}

/// Initialize Sentry error tracking when `SENTRY_DSN` is set.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|d| !d.is_empty())?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: std::env::var("SENTRY_ENVIRONMENT")
                .ok()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let _sentry_guard = init_sentry();

    // Defaults to info level for the client if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "crowdfork_client=info,crowdfork=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        if let CliError::Client(client_error) = &e
            && client_error.requires_login()
        {
            tracing::error!(
                "{}. Run `crowdfork login` and export CROWDFORK_AUTH_TOKEN.",
                client_error.user_message()
            );
        } else {
            tracing::error!("Command failed: {e}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env().map_err(ClientError::from)?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    let session = DiscoverySession::new(config)?;
    let out = output::Output::new(cli.json);

    match cli.command {
        Commands::Login {
            email,
            password,
            token_only,
        } => commands::account::login(&session, &out, &email, password, token_only).await?,
        Commands::Signup { email, password } => {
            commands::account::signup(&session, &out, &email, password).await?;
        }
        Commands::Search {
            term,
            location,
            near_me,
            url,
        } => {
            let request = commands::search::SearchArgs {
                term,
                location,
                near_me,
                url,
            };
            commands::search::search(&session, &out, request).await?;
        }
        Commands::Suggest { text, near_me } => {
            commands::search::suggest(&session, &out, &text, near_me).await?;
        }
        Commands::Restaurant { id } => {
            commands::restaurants::show(&session, &out, &id.into()).await?;
        }
        Commands::Favorites { action } => match action {
            FavoritesAction::List => commands::favorites::list(&session, &out).await?,
            FavoritesAction::Toggle { id } => {
                commands::favorites::toggle(&session, &out, &id.into()).await?;
            }
        },
        Commands::Review { action } => match action {
            ReviewAction::Create {
                restaurant_id,
                rating,
                text,
            } => {
                commands::reviews::create(&session, &out, &restaurant_id.into(), rating, text)
                    .await?;
            }
            ReviewAction::List { restaurant, limit } => {
                commands::reviews::list(&session, &out, restaurant.map(Into::into), limit).await?;
            }
            ReviewAction::Delete { id } => {
                commands::reviews::delete(&session, &out, &id.into()).await?;
            }
            ReviewAction::Count => commands::reviews::count(&session, &out).await?,
        },
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::profile::show(&session, &out).await?,
            ProfileAction::Update {
                display_name,
                bio,
                location,
                avatar_url,
            } => {
                let update = crowdfork_client::api::ProfileUpdate {
                    display_name,
                    bio,
                    location,
                    avatar_url,
                };
                commands::profile::update(&session, &out, &update).await?;
            }
        },
    }
    Ok(())
}
