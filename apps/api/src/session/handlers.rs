//! Axum route handlers for the Session API.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::store::{SelectSkillRequest, SessionView};
use crate::skills::models::SelectedSkillAnnotation;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClearSelectionsResponse {
    pub removed: usize,
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionView>) {
    (StatusCode::CREATED, Json(state.sessions.create()))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.view(session_id)?))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/selections
///
/// Marks an extracted skill as possessed, with the user's notes.
pub async fn handle_select_skill(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SelectSkillRequest>,
) -> Result<(StatusCode, Json<SelectedSkillAnnotation>), AppError> {
    let annotation = state
        .sessions
        .with_session(session_id, |session| session.select(request))?;
    Ok((StatusCode::CREATED, Json(annotation)))
}

/// GET /api/v1/sessions/:id/selections
pub async fn handle_list_selections(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<BTreeMap<String, SelectedSkillAnnotation>>, AppError> {
    let selected = state
        .sessions
        .with_session(session_id, |session| Ok(session.selected().clone()))?;
    Ok(Json(selected))
}

/// DELETE /api/v1/sessions/:id/selections
pub async fn handle_clear_selections(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ClearSelectionsResponse>, AppError> {
    let removed = state
        .sessions
        .with_session(session_id, |session| Ok(session.clear_selected()))?;
    Ok(Json(ClearSelectionsResponse { removed }))
}
