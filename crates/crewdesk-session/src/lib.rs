//! # crewdesk-session: Session Manager
//!
//! Owns the process-wide authenticated identity and the cached access token.
//!
//! - [`Signal`] is the notification cell both values live in. Dependents
//!   subscribe and run synchronously, in registration order, on every
//!   change.
//! - [`IdentityProvider`] is the seam to the external authentication
//!   service. [`MemoryIdentityProvider`] implements it in-process.
//! - [`SessionManager`] wires the two: every identity change recomputes the
//!   cached token, and [`TokenStatus`] reports on the cached token's expiry.
//!
//! Only the session manager writes identity and token. Everything else
//! reads through [`ReadSignal`] handles or the [`TokenSource`] seam.

pub mod error;
pub mod manager;
pub mod memory;
pub mod provider;
pub mod signal;
pub mod token;

pub use error::{AuthError, SessionError};
pub use manager::{SessionManager, TokenSource};
pub use memory::MemoryIdentityProvider;
pub use provider::{ExternalUser, IdentityProvider};
pub use signal::{ListenerId, ReadSignal, Signal};
pub use token::{AccessToken, TokenStatus, EXPIRY_WARNING_SECS};
