//! HTTP handlers and error-to-response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::error::PollError;
use crate::extract::ClientAddress;
use crate::lifecycle::{self, TimeLeft};
use crate::models::{NewPoll, Poll, PollId, VoteRequest};
use crate::pagination::{Page, PageParams};
use crate::state::AppState;
use crate::voting::VoteOutcome;

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            PollError::Validation(v) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": v.reason, "field": v.field }),
            ),
            PollError::PollNotFound(_) | PollError::OptionNotFound { .. } => {
                (StatusCode::NOT_FOUND, json!({ "error": self.to_string() }))
            }
            PollError::Storage(e) => {
                error!(error = %e, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal storage error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

fn bad_body(rejection: JsonRejection) -> Response {
    let text = rejection.body_text();
    let field = missing_field(&text).unwrap_or("body").to_string();
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": text, "field": field })),
    )
        .into_response()
}

fn bad_path(rejection: PathRejection) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": rejection.body_text(), "field": "id" })),
    )
        .into_response()
}

/// Field named by serde's "missing field `x`" message.
fn missing_field(text: &str) -> Option<&str> {
    let rest = text.split_once("missing field `")?.1;
    let (field, _) = rest.split_once('`')?;
    Some(field).filter(|f| !f.is_empty())
}

/// Transport status for each ballot outcome.
pub fn outcome_status(outcome: VoteOutcome) -> StatusCode {
    match outcome {
        VoteOutcome::Created => StatusCode::CREATED,
        VoteOutcome::Replaced => StatusCode::OK,
        VoteOutcome::Duplicate => StatusCode::ALREADY_REPORTED,
        VoteOutcome::ChangeRejected | VoteOutcome::PollClosed => StatusCode::METHOD_NOT_ALLOWED,
    }
}

#[derive(Serialize)]
pub struct PollSummary {
    #[serde(flatten)]
    pub poll: Poll,
    pub remaining_seconds: TimeLeft,
    pub is_open: bool,
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Create a poll together with its options
pub async fn create_poll(
    State(state): State<AppState>,
    payload: Result<Json<NewPoll>, JsonRejection>,
) -> Response {
    let Json(new_poll) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_body(rejection),
    };
    match state.polls.create_poll(new_poll).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// List polls, newest first
pub async fn list_polls(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<PollSummary>>, PollError> {
    let rows = state
        .polls
        .list_polls(params.offset(), params.fetch_limit())
        .await?;
    let now = state.clock.now();
    let page = Page::from_overfetch(rows, &params).map(|poll| PollSummary {
        remaining_seconds: lifecycle::remaining_seconds(&poll, now),
        is_open: lifecycle::is_votable(&poll, now),
        poll,
    });
    Ok(Json(page))
}

/// Poll details as seen by the caller
pub async fn get_poll(
    State(state): State<AppState>,
    poll_id: Result<Path<PollId>, PathRejection>,
    ClientAddress(address): ClientAddress,
) -> Response {
    let Path(poll_id) = match poll_id {
        Ok(p) => p,
        Err(rejection) => return bad_path(rejection),
    };
    match state.details.get_poll_detail(poll_id, &address).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Vote for an option
pub async fn cast_vote(
    State(state): State<AppState>,
    poll_id: Result<Path<PollId>, PathRejection>,
    ClientAddress(address): ClientAddress,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Response {
    let Path(poll_id) = match poll_id {
        Ok(p) => p,
        Err(rejection) => return bad_path(rejection),
    };
    let Json(request) = match payload {
        Ok(r) => r,
        Err(rejection) => return bad_body(rejection),
    };
    match state
        .voting
        .cast_vote(&address, poll_id, request.option_id)
        .await
    {
        Ok(result) => (outcome_status(result.outcome), Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Register the caller's address; 409 if it is already known
pub async fn register_user(
    State(state): State<AppState>,
    ClientAddress(address): ClientAddress,
) -> Result<Response, PollError> {
    let (identity, created) = state.identities.register(&address).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    };
    Ok((status, Json(json!({ "id": identity.id }))).into_response())
}
