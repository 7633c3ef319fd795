// SPDX-License-Identifier: BUSL-1.1
//! In-memory personal-data backend.
//!
//! Serves the `/api/persons` endpoints that `crewdesk-client` calls, with
//! the same wire shapes, so the client and the auth flow can run end to
//! end without the real backend. Data lives in a `DashMap` and is lost on
//! restart.

pub mod routes;
pub mod store;

pub use routes::router;
pub use store::AppState;
