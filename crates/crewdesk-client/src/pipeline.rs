//! # Request augmentation pipeline
//!
//! Every backend call goes through [`ApiPipeline::send`], which in order:
//!
//! 1. asks the [`TokenSource`] for a token (never forcing a refresh),
//! 2. resolves the target: absolute `http(s)` targets are kept, anything
//!    else is joined onto the configured base address,
//! 3. sets `Content-Type: application/json`, and `Authorization: Bearer`
//!    only when a non-empty token was obtained,
//! 4. forwards the request once,
//! 5. on 401 or 403 sends the navigator to the login surface, then returns
//!    [`ApiError::Unauthorized`] to the caller.
//!
//! There is no retry; transport errors are returned as they are.

use std::sync::Arc;

use crewdesk_session::TokenSource;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::ApiError;
use crate::navigator::{Navigator, Redirect};

/// An outgoing backend request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Relative path (`persons/U1`) or absolute URL.
    pub target: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn patch(target: impl Into<String>) -> Self {
        Self::new(Method::PATCH, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    /// Append a query parameter. Repeating a key sends it several times.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    fn endpoint(&self) -> String {
        format!("{} {}", self.method, self.target)
    }
}

fn is_absolute(target: &str) -> bool {
    let lower = target.get(..8).unwrap_or(target).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Single-pass request interceptor in front of the HTTP client.
#[derive(Clone)]
pub struct ApiPipeline {
    http: reqwest::Client,
    base: Url,
    login_path: String,
    tokens: Arc<dyn TokenSource>,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for ApiPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiPipeline")
            .field("base", &self.base.as_str())
            .field("login_path", &self.login_path)
            .finish_non_exhaustive()
    }
}

impl ApiPipeline {
    pub fn new(
        http: reqwest::Client,
        base: Url,
        login_path: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            http,
            base,
            login_path: login_path.into(),
            tokens,
            navigator,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// The URL a request is sent to, query parameters included.
    pub fn resolve_url(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let invalid = |e: url::ParseError| ApiError::InvalidTarget {
            target: request.target.clone(),
            reason: e.to_string(),
        };
        let mut url = if is_absolute(&request.target) {
            Url::parse(&request.target).map_err(invalid)?
        } else {
            self.base
                .join(request.target.trim_start_matches('/'))
                .map_err(invalid)?
        };
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    /// Send `request` through the pipeline. Any 2xx response is returned.
    pub async fn send(&self, request: ApiRequest) -> Result<reqwest::Response, ApiError> {
        let endpoint = request.endpoint();
        let token = self
            .tokens
            .resolve_token()
            .await
            .filter(|token| !token.is_empty());
        let url = self.resolve_url(&request)?;

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &token {
            builder = builder.bearer_auth(token.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }
        tracing::debug!(%endpoint, authenticated = token.is_some(), "sending backend request");

        let response = builder.send().await.map_err(|source| ApiError::Http {
            endpoint: endpoint.clone(),
            source,
        })?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(%endpoint, status = status.as_u16(), "authorization failed, redirecting to login");
            self.navigator.navigate(Redirect {
                path: self.login_path.clone(),
                return_url: Some(self.navigator.current_location()),
            });
            return Err(ApiError::Unauthorized {
                endpoint,
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Send and decode a JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let endpoint = request.endpoint();
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|source| ApiError::Deserialization { endpoint, source })
    }

    /// Like [`send_json`](Self::send_json), with 404 mapped to `None`.
    pub async fn send_optional_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Option<T>, ApiError> {
        match self.send_json(request).await {
            Ok(value) => Ok(Some(value)),
            Err(ApiError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
