//! # Identity provider seam
//!
//! The external authentication service, reduced to the five calls the
//! session manager needs. Implementations must be `Send + Sync` so they can
//! be shared behind an `Arc`; the trait is object-safe so the provider can
//! be chosen at startup (in-memory for development, a hosted provider in
//! production).

use async_trait::async_trait;
use crewdesk_core::{AuthInfo, AuthUid};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::AuthError;
use crate::token::AccessToken;

/// Identity handle issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalUser {
    pub uid: AuthUid,
    pub email: Option<String>,
}

impl ExternalUser {
    pub fn new(uid: AuthUid, email: Option<String>) -> Self {
        Self { uid, email }
    }

    /// The authentication part of a user profile.
    pub fn auth_info(&self) -> AuthInfo {
        AuthInfo {
            email: self.email.clone(),
            local_id: self.uid.clone(),
        }
    }
}

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in with email and password. On success the provider also pushes
    /// the new identity through [`watch_identity`](Self::watch_identity).
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ExternalUser, AuthError>;

    /// End the provider-side session.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The identity the provider currently holds (persisted across restarts
    /// by providers that support it). No network call.
    fn current_user(&self) -> Option<ExternalUser>;

    /// A token for `user`. Without `force_refresh` the provider may return a
    /// cached, still-valid token.
    async fn id_token(
        &self,
        user: &ExternalUser,
        force_refresh: bool,
    ) -> Result<AccessToken, AuthError>;

    /// Identity changes pushed by the provider: sign-in elsewhere, session
    /// expiry, revocation.
    fn watch_identity(&self) -> watch::Receiver<Option<ExternalUser>>;
}
