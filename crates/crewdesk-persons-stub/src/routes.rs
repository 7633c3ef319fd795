// SPDX-License-Identifier: BUSL-1.1
//! Route definitions for the persons stub.
//!
//! Responses deserialize into `crewdesk_core::Person` (`personId` plus
//! snake_case contact fields), matching what `PersonsClient` expects.

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use crewdesk_core::{Person, PersonPatch};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::store::AppState;

/// Build the complete router with all stub routes.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/persons", get(persons_list).post(person_create))
        .route(
            "/api/persons/:id",
            get(person_get).patch(person_update).delete(person_delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .fallback(not_implemented)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Auth ────────────────────────────────────────────────────────────

async fn require_bearer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if !state.requires_auth() {
        return next.run(req).await;
    }
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| !token.trim().is_empty());
    if authorized {
        next.run(req).await
    } else {
        tracing::debug!(path = %req.uri().path(), "rejecting request without bearer token");
        StatusCode::UNAUTHORIZED.into_response()
    }
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> StatusCode {
    StatusCode::OK
}

// ── Persons ─────────────────────────────────────────────────────────

/// `page` is 1-based. Without `limit` every match is returned. Repeated
/// `ids` restrict the result to those person ids.
async fn persons_list(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let mut page: usize = 1;
    let mut limit: Option<usize> = None;
    let mut ids: Vec<String> = Vec::new();
    for (key, value) in params {
        match key.as_str() {
            "page" => match value.parse() {
                Ok(p) => page = p,
                Err(_) => return bad_request("page must be a positive integer"),
            },
            "limit" => match value.parse() {
                Ok(l) => limit = Some(l),
                Err(_) => return bad_request("limit must be a positive integer"),
            },
            "ids" => ids.push(value),
            _ => {}
        }
    }

    let mut matches: Vec<Person> = state
        .persons()
        .iter()
        .filter(|e| ids.is_empty() || ids.contains(e.key()))
        .map(|e| e.value().clone())
        .collect();
    matches.sort_by(|a, b| a.person_id.cmp(&b.person_id));

    let page_items: Vec<Person> = match limit {
        Some(size) => matches
            .into_iter()
            .skip(page.saturating_sub(1).saturating_mul(size))
            .take(size)
            .collect(),
        None => matches,
    };
    Json(page_items).into_response()
}

async fn person_get(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.persons().get(&id) {
        Some(entry) => Json(entry.value().clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn person_create(State(state): State<AppState>, Json(body): Json<Person>) -> Response {
    if body.person_id.is_empty() {
        return bad_request("personId is required");
    }
    let person_id = body.person_id.clone();
    let Some(created) = state.create(body) else {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": format!("person {person_id} already exists") })),
        )
            .into_response();
    };
    tracing::info!(person_id = %created.person_id, "person created");
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn person_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<PersonPatch>,
) -> Response {
    match state.persons().get_mut(&id) {
        Some(mut entry) => {
            entry.value_mut().apply(&patch);
            Json(entry.value().clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn person_delete(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.persons().remove(&id) {
        Some(_) => {
            tracing::info!(person_id = %id, "person deleted");
            Json(json!({ "message": format!("person {id} deleted") })).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
}

// ── Fallback ────────────────────────────────────────────────────────

async fn not_implemented() -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}
