//! Session and identity-provider errors.

/// Failures reported by the identity provider.
///
/// The session manager surfaces these to its caller unchanged and never
/// retries them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Email/password pair rejected.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The account or session was revoked by the provider.
    #[error("session revoked")]
    SessionRevoked,
    /// The provider could not be reached or refused to serve the call.
    #[error("identity provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },
}

/// Errors constructing a session manager.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Token recomputation runs on the Tokio runtime; none was entered.
    #[error("no async runtime available for the session manager")]
    NoRuntime,
}
