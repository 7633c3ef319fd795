//! # SessionManager
//!
//! Holds two signals:
//!
//! - `identity`: the last identity known to this process, updated by
//!   [`sign_in`](SessionManager::sign_in), [`sign_out`](SessionManager::sign_out)
//!   and by pushes from the provider.
//! - `token`: the cached access token. It depends on `identity`: every
//!   identity change clears it and, when an identity is present, schedules a
//!   fetch from the provider. Every fetch, including explicit refreshes and
//!   per-request resolution, is tagged with a generation number and results
//!   from superseded generations are discarded, so the recomputation is
//!   idempotent and the token always belongs to the current identity.
//!
//! Sign-out clears local state even when the provider call fails.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{AuthError, SessionError};
use crate::provider::{ExternalUser, IdentityProvider};
use crate::signal::{ReadSignal, Signal};
use crate::token::{AccessToken, TokenStatus};

/// Resolves a bearer token for outgoing requests.
///
/// Resolution talks to the identity provider directly and never goes through
/// the request pipeline it serves.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A token for the current identity without forcing a refresh. `None`
    /// when nobody is signed in or the provider could not supply one.
    async fn resolve_token(&self) -> Option<AccessToken>;
}

/// Process-wide session state.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    identity: Signal<Option<ExternalUser>>,
    token: Signal<Option<AccessToken>>,
    generation: AtomicU64,
    /// Serializes generation bumps against token writes.
    token_gate: Mutex<()>,
    runtime: Handle,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("identity", &self.identity.get())
            .field("has_token", &self.token.get().is_some())
            .finish()
    }
}

impl SessionManager {
    /// Start a session manager on the current Tokio runtime.
    ///
    /// The identity the provider already holds (a persisted session) is
    /// adopted immediately, and provider pushes are forwarded for as long as
    /// the manager lives.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoRuntime`] when called outside a runtime.
    pub fn start(provider: Arc<dyn IdentityProvider>) -> Result<Arc<Self>, SessionError> {
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;
        let mut pushes = provider.watch_identity();

        let manager = Arc::new(Self {
            provider,
            identity: Signal::new(None),
            token: Signal::new(None),
            generation: AtomicU64::new(0),
            token_gate: Mutex::new(()),
            runtime,
            forwarder: Mutex::new(None),
        });

        let weak = Arc::downgrade(&manager);
        manager.identity.subscribe(move |user| {
            if let Some(manager) = weak.upgrade() {
                manager.recompute_token(user.clone());
            }
        });

        manager.identity.set(manager.provider.current_user());

        let weak = Arc::downgrade(&manager);
        let forwarder = manager.runtime.spawn(async move {
            while pushes.changed().await.is_ok() {
                let user = pushes.borrow_and_update().clone();
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                tracing::debug!(
                    uid = user.as_ref().map(|u| u.uid.as_str()),
                    "identity change pushed by provider"
                );
                manager.identity.set(user);
            }
        });
        *manager.forwarder.lock() = Some(forwarder);

        Ok(manager)
    }

    /// Sign in with email and password.
    ///
    /// On success the identity is set, which schedules a token fetch.
    /// Provider failures are returned unchanged.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<ExternalUser, AuthError> {
        match self.provider.sign_in_with_password(email, password).await {
            Ok(user) => {
                tracing::info!(uid = %user.uid, "signed in");
                self.identity.set(Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-in rejected by identity provider");
                Err(e)
            }
        }
    }

    /// Sign out. Identity and token are cleared whatever the provider
    /// answers; a provider failure is still reported.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = self.provider.sign_out().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "provider sign-out failed; clearing local session anyway");
        }
        {
            let _gate = self.token_gate.lock();
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        self.identity.set(None);
        self.token.set(None);
        tracing::info!("signed out");
        result
    }

    /// Last known identity. No network call.
    pub fn current_identity(&self) -> Option<ExternalUser> {
        self.identity.get()
    }

    /// Observable identity.
    pub fn identity(&self) -> ReadSignal<Option<ExternalUser>> {
        self.identity.read_only()
    }

    /// Observable cached token.
    pub fn token(&self) -> ReadSignal<Option<AccessToken>> {
        self.token.read_only()
    }

    pub fn cached_token(&self) -> Option<AccessToken> {
        self.token.get()
    }

    /// Ask the provider for a new token. On failure, or with nobody signed
    /// in, the cached token is cleared and `None` returned. A token that
    /// arrives after the identity changed is discarded and `None` returned.
    pub async fn refresh_token(&self, force: bool) -> Option<AccessToken> {
        let generation = self.generation.load(Ordering::SeqCst);
        let Some(user) = self.current_identity() else {
            self.commit_token(generation, None, None);
            return None;
        };
        match self.provider.id_token(&user, force).await {
            Ok(token) => self
                .commit_token(generation, Some(&user), Some(token.clone()))
                .then_some(token),
            Err(e) => {
                tracing::warn!(uid = %user.uid, error = %e, "token refresh failed");
                self.commit_token(generation, Some(&user), None);
                None
            }
        }
    }

    /// Expiry status of the cached token now.
    pub fn token_status(&self) -> TokenStatus {
        self.token_status_at(Utc::now())
    }

    /// Expiry status of the cached token at `now`.
    pub fn token_status_at(&self, now: DateTime<Utc>) -> TokenStatus {
        match (self.current_identity(), self.token.get()) {
            (Some(_), Some(token)) => token.status_at(now),
            _ => TokenStatus::invalid(),
        }
    }

    /// Store `token` only if no identity change happened since `generation`
    /// was read and `user` is still the current identity. Returns whether
    /// it was stored.
    fn commit_token(
        &self,
        generation: u64,
        user: Option<&ExternalUser>,
        token: Option<AccessToken>,
    ) -> bool {
        let _gate = self.token_gate.lock();
        let current = self.identity.get();
        let same_user = current.as_ref().map(|u| &u.uid) == user.map(|u| &u.uid);
        if self.generation.load(Ordering::SeqCst) != generation || !same_user {
            tracing::debug!(
                uid = user.map(|u| u.uid.as_str()),
                "discarding token for superseded identity"
            );
            return false;
        }
        self.token.set(token);
        true
    }

    fn recompute_token(self: &Arc<Self>, user: Option<ExternalUser>) {
        let generation = {
            let _gate = self.token_gate.lock();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            self.token.set(None);
            generation
        };
        let Some(user) = user else {
            return;
        };

        let provider = Arc::clone(&self.provider);
        let weak: Weak<Self> = Arc::downgrade(self);
        self.runtime.spawn(async move {
            let fetched = provider.id_token(&user, false).await;
            let Some(manager) = weak.upgrade() else {
                return;
            };
            match fetched {
                Ok(token) => {
                    manager.commit_token(generation, Some(&user), Some(token));
                }
                Err(e) => {
                    tracing::warn!(uid = %user.uid, error = %e, "failed to fetch token for identity");
                    manager.commit_token(generation, Some(&user), None);
                }
            }
        });
    }
}

#[async_trait]
impl TokenSource for SessionManager {
    async fn resolve_token(&self) -> Option<AccessToken> {
        let generation = self.generation.load(Ordering::SeqCst);
        let user = self.current_identity()?;
        if let Some(cached) = self.token.get() {
            if !cached.is_empty() && cached.status_at(Utc::now()).valid {
                return Some(cached);
            }
        }
        match self.provider.id_token(&user, false).await {
            Ok(token) if !token.is_empty() => self
                .commit_token(generation, Some(&user), Some(token.clone()))
                .then_some(token),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(uid = %user.uid, error = %e, "failed to resolve token for request");
                None
            }
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.lock().take() {
            forwarder.abort();
        }
    }
}
