//! Personal-data backend client.
//!
//! Records are addressed by `person_id`, the identity provider's uid of the
//! person. Every call goes through the [`ApiPipeline`].

use crewdesk_core::{Person, PersonPatch};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::pipeline::{ApiPipeline, ApiRequest};

const PERSONS: &str = "persons";

/// Listing parameters. Zero and empty values are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub ids: Vec<String>,
}

impl PersonsQuery {
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.extend(ids.into_iter().map(Into::into));
        self
    }

    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(page) = self.page.filter(|p| *p > 0) {
            request = request.query("page", page);
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            request = request.query("limit", limit);
        }
        for id in &self.ids {
            request = request.query("ids", id);
        }
        request
    }
}

/// Body of a delete acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Typed access to `/persons`.
#[derive(Debug, Clone)]
pub struct PersonsClient {
    pipeline: ApiPipeline,
}

fn person_path(id: &str) -> Result<String, ApiError> {
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ApiError::InvalidTarget {
            target: format!("{PERSONS}/{id}"),
            reason: "person id must be a single non-empty path segment".into(),
        });
    }
    Ok(format!("{PERSONS}/{id}"))
}

impl PersonsClient {
    pub fn new(pipeline: ApiPipeline) -> Self {
        Self { pipeline }
    }

    /// The record for `id`, or `None` if the backend has none.
    pub async fn get_person_by_id(&self, id: &str) -> Result<Option<Person>, ApiError> {
        let request = ApiRequest::get(person_path(id)?);
        self.pipeline.send_optional_json(request).await
    }

    pub async fn get_all_persons(&self, query: &PersonsQuery) -> Result<Vec<Person>, ApiError> {
        let request = query.apply(ApiRequest::get(PERSONS));
        self.pipeline.send_json(request).await
    }

    pub async fn create_person(&self, person: &Person) -> Result<Person, ApiError> {
        let request = ApiRequest::post(PERSONS).json(person)?;
        self.pipeline.send_json(request).await
    }

    pub async fn update_person(&self, id: &str, patch: &PersonPatch) -> Result<Person, ApiError> {
        let request = ApiRequest::patch(person_path(id)?).json(patch)?;
        self.pipeline.send_json(request).await
    }

    pub async fn delete_person(&self, id: &str) -> Result<DeleteResponse, ApiError> {
        let request = ApiRequest::delete(person_path(id)?);
        self.pipeline.send_json(request).await
    }
}
