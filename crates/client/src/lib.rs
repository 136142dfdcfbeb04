//! CrowdFork discovery client.
//!
//! The search-and-favorites session controller for the CrowdFork restaurant
//! API: live query state, debounced suggestions, device location, generation
//! gated searches and optimistic favorites, all kept consistent across
//! overlapping requests and session expiry.
//!
//! # Architecture
//!
//! ```text
//! DiscoverySession
//!  ├── SuggestionEngine ──┐
//!  ├── SearchOrchestrator ┼──▶ ApiClient ──▶ CredentialStore ──▶ SessionEvent
//!  ├── FavoritesSynchronizer ┘
//!  └── GeolocationResolver ──▶ LocationProvider
//! ```
//!
//! # Modules
//!
//! - [`api`] - REST adapter, wire types and the detail cache
//! - [`credentials`] - Session token holder and lifecycle events
//! - [`suggest`] - Debounced autocomplete
//! - [`geo`] - Device location acquisition
//! - [`search`] - Query ownership, dispatch and shareable URLs
//! - [`favorites`] - Optimistic favorite toggling
//! - [`discovery`] - The composed session shell
//! - [`hours`] - Opening hours formatting

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod favorites;
pub mod geo;
pub mod hours;
pub mod search;
pub mod suggest;

pub use api::{ApiClient, ApiError};
pub use config::{ClientConfig, ConfigError};
pub use credentials::{CredentialStore, SessionEvent};
pub use discovery::{DiscoverySession, RestaurantPage, SessionWatcher};
pub use error::ClientError;
pub use favorites::{FavoritesSnapshot, FavoritesSynchronizer};
pub use geo::{FixedLocation, GeoError, GeolocationResolver, LocationProvider, NoLocation};
pub use search::{DispatchOutcome, Query, SearchOrchestrator, SearchSnapshot};
pub use suggest::{SuggestionEngine, SuggestionPhase, SuggestionSnapshot};
