//! Debounced autocomplete suggestions.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──input──▶ Pending ──debounce──▶ request ──▶ Applied | Superseded | Failed
//!                   │
//!                   └──input──▶ (timer aborted, new Pending)
//! ```
//!
//! Every request that leaves the debounce window takes the next generation
//! number. A response is applied only if its generation is still the latest
//! one issued; anything older is dropped without touching state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crowdfork_core::Coordinates;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::ApiClient;

/// Observable phase of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuggestionPhase {
    /// Nothing typed yet.
    #[default]
    Idle,
    /// Waiting for the debounce window or for the backend.
    Pending,
    /// The latest request's candidates are in place.
    Applied,
    /// The latest request failed; the list was cleared.
    Failed,
}

/// What happened to a single response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Superseded,
    Failed,
}

/// Point-in-time view of the suggestion list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SuggestionSnapshot {
    pub suggestions: Vec<String>,
    pub visible: bool,
    pub phase: SuggestionPhase,
    /// Generation of the list currently shown.
    pub generation: u64,
}

#[derive(Default)]
struct SuggestState {
    /// Latest generation issued to a request.
    issued: u64,
    /// Generation the current list belongs to.
    applied: u64,
    /// Ticket of the scheduled (not yet fired) debounce task.
    ticket: u64,
    scheduled: Option<(u64, JoinHandle<()>)>,
    suggestions: Vec<String>,
    visible: bool,
    phase: SuggestionPhase,
}

impl SuggestState {
    fn cancel_scheduled(&mut self) -> bool {
        match self.scheduled.take() {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

struct SuggestInner {
    api: ApiClient,
    debounce: Duration,
    state: Mutex<SuggestState>,
}

/// Debounces free-text input and keeps the newest autocomplete candidates.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SuggestionEngine {
    inner: Arc<SuggestInner>,
}

impl std::fmt::Debug for SuggestionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionEngine")
            .field("debounce", &self.inner.debounce)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl SuggestionEngine {
    #[must_use]
    pub fn new(api: ApiClient, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(SuggestInner {
                api,
                debounce,
                state: Mutex::new(SuggestState::default()),
            }),
        }
    }

    /// React to an edit of the query text.
    ///
    /// Must be called from within a tokio runtime. Blank text clears the list
    /// immediately; anything else (re)starts the debounce window, optionally
    /// biased towards `near`.
    pub fn input(&self, text: &str, near: Option<Coordinates>) {
        let text = text.trim().to_string();
        let mut state = self.state();
        state.cancel_scheduled();

        if text.is_empty() {
            state.issued += 1;
            state.applied = state.issued;
            state.suggestions.clear();
            state.visible = false;
            state.phase = SuggestionPhase::Applied;
            return;
        }

        state.ticket += 1;
        let ticket = state.ticket;
        state.phase = SuggestionPhase::Pending;

        let engine = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(engine.inner.debounce).await;
            engine.fire(ticket, &text, near).await;
        });
        state.scheduled = Some((ticket, handle));
    }

    /// Issue the request for a debounce task whose window has elapsed.
    async fn fire(&self, ticket: u64, text: &str, near: Option<Coordinates>) {
        let generation = {
            let mut state = self.state();
            if state.scheduled.as_ref().map(|(current, _)| *current) != Some(ticket) {
                return;
            }
            // Fired: no longer abortable by later input.
            state.scheduled = None;
            state.issued += 1;
            state.issued
        };

        debug!(generation, text, "Requesting suggestions");
        let result = self.inner.api.autocomplete(text, near).await;
        self.apply(generation, result);
    }

    fn apply(
        &self,
        generation: u64,
        result: Result<Vec<String>, crate::api::ApiError>,
    ) -> FetchOutcome {
        let mut state = self.state();
        if generation != state.issued {
            debug!(generation, latest = state.issued, "Dropping stale suggestions");
            return FetchOutcome::Superseded;
        }

        state.applied = generation;
        match result {
            Ok(suggestions) => {
                state.visible = true;
                state.suggestions = suggestions;
                state.phase = SuggestionPhase::Applied;
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch suggestions");
                state.suggestions.clear();
                state.visible = false;
                state.phase = SuggestionPhase::Failed;
                FetchOutcome::Failed
            }
        }
    }

    /// Accept a suggestion: cancel the pending timer, make outstanding
    /// requests stale and hide the list. Returns the accepted text.
    pub fn accept(&self, suggestion: &str) -> String {
        let mut state = self.state();
        state.cancel_scheduled();
        state.issued += 1;
        state.visible = false;
        if state.phase == SuggestionPhase::Pending {
            state.phase = SuggestionPhase::Idle;
        }
        suggestion.trim().to_string()
    }

    /// Hide the list without discarding it.
    pub fn dismiss(&self) {
        self.state().visible = false;
    }

    /// Show the retained list again, if there is one.
    pub fn show(&self) {
        let mut state = self.state();
        state.visible = !state.suggestions.is_empty();
    }

    /// Whether a debounce timer is waiting to fire.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.state().scheduled.is_some()
    }

    #[must_use]
    pub fn snapshot(&self) -> SuggestionSnapshot {
        let state = self.state();
        SuggestionSnapshot {
            suggestions: state.suggestions.clone(),
            visible: state.visible,
            phase: state.phase,
            generation: state.applied,
        }
    }

    fn state(&self) -> MutexGuard<'_, SuggestState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
