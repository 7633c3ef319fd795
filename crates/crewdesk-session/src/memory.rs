//! In-process identity provider.
//!
//! Used for local development and tests. Accounts are registered up front;
//! tokens are JWT-shaped but unsigned, with a configurable lifetime, so that
//! expiry introspection behaves as it does against a hosted provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use crewdesk_core::AuthUid;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::watch;
use zeroize::Zeroizing;

use crate::error::AuthError;
use crate::provider::{ExternalUser, IdentityProvider};
use crate::token::{encode_unsigned, AccessToken};

struct Account {
    password: Zeroizing<String>,
    user: ExternalUser,
    revoked: bool,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    current: Option<ExternalUser>,
    tokens: HashMap<AuthUid, AccessToken>,
    unavailable: bool,
}

/// Identity provider backed by an in-memory account table.
pub struct MemoryIdentityProvider {
    state: Mutex<State>,
    identity_tx: watch::Sender<Option<ExternalUser>>,
    token_ttl: Duration,
    issued: AtomicU64,
    sign_ins: AtomicU64,
    token_requests: AtomicU64,
    forced_refreshes: AtomicU64,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    /// Provider issuing one-hour tokens.
    pub fn new() -> Self {
        Self::with_token_ttl(Duration::hours(1))
    }

    pub fn with_token_ttl(token_ttl: Duration) -> Self {
        let (identity_tx, _rx) = watch::channel(None);
        Self {
            state: Mutex::new(State::default()),
            identity_tx,
            token_ttl,
            issued: AtomicU64::new(0),
            sign_ins: AtomicU64::new(0),
            token_requests: AtomicU64::new(0),
            forced_refreshes: AtomicU64::new(0),
        }
    }

    /// Register an account. Re-registering an email replaces it.
    pub fn register(&self, email: &str, password: &str, uid: AuthUid) -> ExternalUser {
        let user = ExternalUser::new(uid, Some(email.to_string()));
        self.state.lock().accounts.insert(
            email.to_lowercase(),
            Account {
                password: Zeroizing::new(password.to_string()),
                user: user.clone(),
                revoked: false,
            },
        );
        user
    }

    /// Simulate an outage: every call fails with `ProviderUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.state.lock().unavailable = !available;
    }

    /// Revoke an account. If it is the current identity, `None` is pushed.
    pub fn revoke(&self, uid: &AuthUid) {
        let mut state = self.state.lock();
        for account in state.accounts.values_mut() {
            if &account.user.uid == uid {
                account.revoked = true;
            }
        }
        state.tokens.remove(uid);
        if state.current.as_ref().is_some_and(|u| &u.uid == uid) {
            state.current = None;
            drop(state);
            self.identity_tx.send_replace(None);
        }
    }

    /// Push an identity as if it changed elsewhere (another tab, another device).
    pub fn push_identity(&self, user: Option<ExternalUser>) {
        self.state.lock().current = user.clone();
        self.identity_tx.send_replace(user);
    }

    pub fn sign_in_count(&self) -> u64 {
        self.sign_ins.load(Ordering::SeqCst)
    }

    pub fn token_requests(&self) -> u64 {
        self.token_requests.load(Ordering::SeqCst)
    }

    pub fn forced_refreshes(&self) -> u64 {
        self.forced_refreshes.load(Ordering::SeqCst)
    }

    fn ensure_available(state: &State) -> Result<(), AuthError> {
        if state.unavailable {
            return Err(AuthError::ProviderUnavailable {
                reason: "in-memory provider switched off".into(),
            });
        }
        Ok(())
    }

    fn issue(&self, user: &ExternalUser) -> AccessToken {
        let now = Utc::now();
        let serial = self.issued.fetch_add(1, Ordering::SeqCst);
        AccessToken::new(encode_unsigned(&json!({
            "sub": user.uid.as_str(),
            "email": user.email,
            "iat": now.timestamp(),
            "exp": (now + self.token_ttl).timestamp(),
            "jti": serial,
        })))
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ExternalUser, AuthError> {
        self.sign_ins.fetch_add(1, Ordering::SeqCst);
        let user = {
            let mut state = self.state.lock();
            Self::ensure_available(&state)?;
            let account = state
                .accounts
                .get(&email.to_lowercase())
                .ok_or(AuthError::InvalidCredentials)?;
            if account.password.as_str() != password {
                return Err(AuthError::InvalidCredentials);
            }
            if account.revoked {
                return Err(AuthError::SessionRevoked);
            }
            let user = account.user.clone();
            state.current = Some(user.clone());
            user
        };
        self.identity_tx.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        {
            let mut state = self.state.lock();
            Self::ensure_available(&state)?;
            state.current = None;
        }
        self.identity_tx.send_replace(None);
        Ok(())
    }

    fn current_user(&self) -> Option<ExternalUser> {
        self.state.lock().current.clone()
    }

    async fn id_token(
        &self,
        user: &ExternalUser,
        force_refresh: bool,
    ) -> Result<AccessToken, AuthError> {
        self.token_requests.fetch_add(1, Ordering::SeqCst);
        if force_refresh {
            self.forced_refreshes.fetch_add(1, Ordering::SeqCst);
        }
        let mut state = self.state.lock();
        Self::ensure_available(&state)?;
        let revoked = state
            .accounts
            .values()
            .any(|a| a.user.uid == user.uid && a.revoked);
        if revoked {
            return Err(AuthError::SessionRevoked);
        }
        if !force_refresh {
            if let Some(cached) = state.tokens.get(&user.uid) {
                if cached.status_at(Utc::now()).valid {
                    return Ok(cached.clone());
                }
            }
        }
        let token = self.issue(user);
        state.tokens.insert(user.uid.clone(), token.clone());
        Ok(token)
    }

    fn watch_identity(&self) -> watch::Receiver<Option<ExternalUser>> {
        self.identity_tx.subscribe()
    }
}
