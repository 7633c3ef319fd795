//! # crewdesk-state: Authentication state machine
//!
//! One state struct ([`AuthState`]), a closed set of events ([`AuthEvent`])
//! and a pure transition function ([`reduce`]). Side effects live outside
//! the reducer: [`AuthEffects`] observes dispatched events, performs the
//! sign-in, sign-out and profile lookups, and dispatches the outcome.
//!
//! ```text
//! LoginRequested ──sign_in──▶ LoginSucceeded ──resolve──▶ UserDataSet
//!               └──────────▶ LoginFailed
//! LogoutRequested ─sign_out─▶ LogoutSucceeded | LogoutFailed
//! ```

pub mod auth;
pub mod effects;
pub mod profile;
pub mod store;

pub use auth::{reduce, selectors, AuthEvent, AuthState, Credentials};
pub use effects::AuthEffects;
pub use profile::{EmployeeDirectory, LookupError, PersonDirectory, ProfileResolver};
pub use store::AuthStore;
