//! # crewdesk-client: Backend HTTP client
//!
//! Typed access to the HTTP backends (currently the personal-data service).
//!
//! ## Architecture
//!
//! Every request goes through one [`ApiPipeline`]: it attaches the session's
//! bearer token, resolves relative targets against the configured base
//! address, and on 401/403 sends the [`Navigator`] to the login surface
//! before returning the error. Typed clients such as [`PersonsClient`]
//! only build [`ApiRequest`]s.
//!
//! Tokens come from a [`TokenSource`](crewdesk_session::TokenSource), which
//! the session manager implements.

pub mod config;
pub mod error;
pub mod navigator;
pub mod persons;
pub mod pipeline;

pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
pub use navigator::{Navigator, RecordingNavigator, Redirect};
pub use persons::{DeleteResponse, PersonsClient, PersonsQuery};
pub use pipeline::{ApiPipeline, ApiRequest};

use std::sync::Arc;
use std::time::Duration;

use crewdesk_session::TokenSource;

/// Top-level backend client. Holds the pipeline and the typed sub-clients.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pipeline: ApiPipeline,
    persons: PersonsClient,
}

impl ApiClient {
    pub fn new(
        config: ClientConfig,
        tokens: Arc<dyn TokenSource>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        let pipeline = ApiPipeline::new(http, config.api_url, config.login_path, tokens, navigator);
        Ok(Self {
            persons: PersonsClient::new(pipeline.clone()),
            pipeline,
        })
    }

    /// The shared request pipeline, for calls without a typed client.
    pub fn pipeline(&self) -> &ApiPipeline {
        &self.pipeline
    }

    /// Access the personal-data client.
    pub fn persons(&self) -> &PersonsClient {
        &self.persons
    }
}
