//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; field values are never logged, only lengths.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::error::IntakeError;
use crate::logic::{apply_action, FormAction, SubmitOutcome};
use crate::protocol::*;
use crate::state::AppState;

fn not_found(id: &str) -> Response {
  (StatusCode::NOT_FOUND, Json(ErrorOut { error: format!("Unknown form session: {}", id) })).into_response()
}

fn bad_request(e: IntakeError) -> Response {
  (StatusCode::BAD_REQUEST, Json(ErrorOut { error: e.to_string() })).into_response()
}

/// Apply one action to a session and answer with its refreshed view.
async fn act(state: &AppState, id: &str, action: FormAction) -> Response {
  let result = state
    .with_session(id, |ctrl| apply_action(ctrl, action).map(|()| to_view(id, ctrl)))
    .await;
  match result {
    None => not_found(id),
    Some(Err(e)) => bad_request(e),
    Some(Ok(view)) => Json(view).into_response(),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, sessions: state.session_count().await })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_schema(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(schema_out(&state.schema))
}

#[instrument(level = "info", skip(state))]
pub async fn http_open_form(State(state): State<Arc<AppState>>) -> Response {
  match state.open_session().await {
    Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
    Err(e) => (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorOut { error: e.to_string() })).into_response(),
  }
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_form(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
  match state.with_session(&id, |ctrl| to_view(&id, ctrl)).await {
    Some(view) => Json(view).into_response(),
    None => not_found(&id),
  }
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_discard_form(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
  if state.discard(&id).await {
    StatusCode::NO_CONTENT.into_response()
  } else {
    not_found(&id)
  }
}

#[instrument(level = "info", skip(state, body), fields(%id, field = %body.name))]
pub async fn http_set_field(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<FieldIn>,
) -> Response {
  act(&state, &id, FormAction::SetField { name: body.name, value: body.value }).await
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_next(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
  act(&state, &id, FormAction::Next).await
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_previous(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
  act(&state, &id, FormAction::Previous).await
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_append_course(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
  act(&state, &id, FormAction::AppendCourse).await
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_remove_course(
  State(state): State<Arc<AppState>>,
  Path((id, index)): Path<(String, usize)>,
) -> Response {
  act(&state, &id, FormAction::RemoveCourse { index }).await
}

#[instrument(level = "info", skip(state, body), fields(%id, field = %body.field, value_len = body.value.len()))]
pub async fn http_set_course_field(
  State(state): State<Arc<AppState>>,
  Path((id, index)): Path<(String, usize)>,
  Json(body): Json<CourseFieldIn>,
) -> Response {
  act(&state, &id, FormAction::SetCourseField { index, field: body.field, value: body.value }).await
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_submit(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
  match state.submit_session(&id).await {
    None => not_found(&id),
    Some(Err(e)) => bad_request(e),
    Some(Ok(SubmitOutcome::Accepted(payload))) => {
      info!(target: "intake", %id, entries = payload.len(), "HTTP submit accepted");
      Json(SubmittedOut { ok: true, payload }).into_response()
    }
    Some(Ok(SubmitOutcome::Rejected { step_index, errors })) => {
      info!(target: "intake", %id, errors = errors.len(), "HTTP submit rejected");
      (StatusCode::UNPROCESSABLE_ENTITY, Json(RejectedOut { ok: false, step_index, errors })).into_response()
    }
  }
}
