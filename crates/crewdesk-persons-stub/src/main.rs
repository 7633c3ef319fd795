// SPDX-License-Identifier: BUSL-1.1
//! Persons stub server: standalone development server.
//!
//! Storage is in-memory with no persistence.

use std::net::SocketAddr;

use anyhow::Context;
use crewdesk_persons_stub::{router, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("PERSONS_STUB_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3000);
    let require_auth = std::env::var("PERSONS_STUB_REQUIRE_AUTH")
        .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"))
        .unwrap_or(true);

    let app = router(AppState::new(require_auth));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(require_auth, "crewdesk-persons-stub listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("server error")?;
    Ok(())
}
