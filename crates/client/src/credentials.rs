//! Session credential store and session lifecycle events.
//!
//! The store is an explicitly shared context object: the HTTP adapter, the
//! discovery shell and the CLI all hold clones of the same [`CredentialStore`].
//! Nothing in here talks to the network.
//!
//! Every stored token is stamped with an epoch. A request remembers the epoch
//! of the token it was sent with, so a late `401` for an old token can never
//! clear a token stored after it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use secrecy::SecretString;
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 32;

/// Session lifecycle notifications published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A token was stored (login success or restored token).
    SignedIn,
    /// The user signed out explicitly.
    SignedOut,
    /// A protected call was attempted without a token.
    LoginRequired,
    /// The backend rejected the token; it has been cleared.
    SessionExpired,
}

impl SessionEvent {
    /// Whether the shell should navigate to the login entry point.
    #[must_use]
    pub const fn redirects_to_login(self) -> bool {
        matches!(self, Self::LoginRequired | Self::SessionExpired)
    }
}

/// Token handed to a single outbound request.
#[derive(Clone)]
pub(crate) struct TokenLease {
    pub(crate) token: SecretString,
    pub(crate) epoch: u64,
}

struct StoredToken {
    token: SecretString,
    epoch: u64,
}

struct StoreInner {
    slot: RwLock<Option<StoredToken>>,
    next_epoch: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

/// Holder of the opaque bearer token for the current session.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("has_token", &self.has())
            .finish_non_exhaustive()
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                slot: RwLock::new(None),
                next_epoch: AtomicU64::new(1),
                events,
            }),
        }
    }

    /// Create a store already holding `token`, without publishing an event.
    #[must_use]
    pub fn with_token(token: SecretString) -> Self {
        let store = Self::new();
        store.store(token);
        store
    }

    /// Whether a token is present.
    #[must_use]
    pub fn has(&self) -> bool {
        self.read_slot(|slot| slot.is_some())
    }

    /// The current token, if any.
    #[must_use]
    pub fn get(&self) -> Option<SecretString> {
        self.read_slot(|slot| slot.as_ref().map(|stored| stored.token.clone()))
    }

    /// Store a new token, replacing any previous one.
    pub fn set(&self, token: SecretString) {
        self.store(token);
        info!("Session token stored");
        self.publish(SessionEvent::SignedIn);
    }

    /// Remove the token. Returns `true` if a token was present.
    ///
    /// Idempotent: clearing an empty store is a no-op.
    pub fn clear(&self) -> bool {
        let removed = self.write_slot(Option::take).is_some();
        if removed {
            debug!("Session token cleared");
        }
        removed
    }

    /// Clear the token and publish [`SessionEvent::SignedOut`] if one was held.
    pub fn sign_out(&self) -> bool {
        let removed = self.clear();
        if removed {
            self.publish(SessionEvent::SignedOut);
        }
        removed
    }

    /// Subscribe to session lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn lease(&self) -> Option<TokenLease> {
        self.read_slot(|slot| {
            slot.as_ref().map(|stored| TokenLease {
                token: stored.token.clone(),
                epoch: stored.epoch,
            })
        })
    }

    /// Clear the token that was used by a rejected request.
    ///
    /// Only the first rejection of a given token clears it and publishes
    /// [`SessionEvent::SessionExpired`]; later rejections of the same token,
    /// or rejections of a token that has since been replaced, are no-ops.
    pub(crate) fn expire(&self, epoch: u64) -> bool {
        let expired = self.write_slot(|slot| {
            if slot.as_ref().is_some_and(|stored| stored.epoch == epoch) {
                slot.take();
                true
            } else {
                false
            }
        });

        if expired {
            info!(epoch, "Session token rejected by backend, cleared");
            self.publish(SessionEvent::SessionExpired);
        } else {
            debug!(epoch, "Ignoring rejection for a token that is no longer current");
        }
        expired
    }

    pub(crate) fn require_login(&self) {
        self.publish(SessionEvent::LoginRequired);
    }

    fn store(&self, token: SecretString) {
        let epoch = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed);
        self.write_slot(|slot| *slot = Some(StoredToken { token, epoch }));
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine; the event is informational for the shell.
        let _ = self.inner.events.send(event);
    }

    fn read_slot<R>(&self, f: impl FnOnce(&Option<StoredToken>) -> R) -> R {
        let guard = self
            .inner
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write_slot<R>(&self, f: impl FnOnce(&mut Option<StoredToken>) -> R) -> R {
        let mut guard = self
            .inner
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_empty_store() {
        let store = CredentialStore::new();
        assert!(!store.has());
        assert!(store.get().is_none());
    }

    #[test]
    fn test_set_and_get() {
        let store = CredentialStore::new();
        store.set(SecretString::from("tok-1"));
        assert!(store.has());
        assert_eq!(store.get().unwrap().expose_secret(), "tok-1");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = CredentialStore::with_token(SecretString::from("tok-1"));
        assert!(store.clear());
        assert!(!store.clear());
        assert!(!store.has());
    }

    #[test]
    fn test_clones_share_state() {
        let store = CredentialStore::new();
        let other = store.clone();
        store.set(SecretString::from("tok-1"));
        assert!(other.has());
    }

    #[test]
    fn test_expire_only_once_per_token() {
        let store = CredentialStore::with_token(SecretString::from("tok-1"));
        let mut events = store.subscribe();
        let lease = store.lease().unwrap();

        assert!(store.expire(lease.epoch));
        assert!(!store.expire(lease.epoch));

        assert_eq!(events.try_recv().unwrap(), SessionEvent::SessionExpired);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_stale_rejection_keeps_new_token() {
        let store = CredentialStore::with_token(SecretString::from("old"));
        let old = store.lease().unwrap();
        store.set(SecretString::from("new"));

        assert!(!store.expire(old.epoch));
        assert_eq!(store.get().unwrap().expose_secret(), "new");
    }

    #[test]
    fn test_sign_out_publishes_once() {
        let store = CredentialStore::with_token(SecretString::from("tok"));
        let mut events = store.subscribe();

        assert!(store.sign_out());
        assert!(!store.sign_out());

        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedOut);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_redirect_classification() {
        assert!(SessionEvent::LoginRequired.redirects_to_login());
        assert!(SessionEvent::SessionExpired.redirects_to_login());
        assert!(!SessionEvent::SignedOut.redirects_to_login());
        assert!(!SessionEvent::SignedIn.redirects_to_login());
    }
}
