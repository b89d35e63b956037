//! Axum route handlers for skill extraction and job description analysis.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::{analyze_job_description, RawAnalysis};
use crate::skills::extractor::extract_skills;
use crate::skills::models::ExtractedSkillSet;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub job_description: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
}

/// POST /api/v1/sessions/:id/extract
///
/// Extracts categorized skills from a job description and stores them in the
/// session, replacing any previous extraction. One extraction per session at a time.
pub async fn handle_extract(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractedSkillSet>, AppError> {
    let guard = state.sessions.begin_extraction(session_id)?;

    let skills = extract_skills(state.generator.as_ref(), &request.job_description).await?;
    guard.complete(skills.clone())?;

    Ok(Json(skills))
}

/// POST /api/v1/analyze
///
/// General job description breakdown. Returns the model's answer unparsed.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<RawAnalysis>, AppError> {
    let analysis = analyze_job_description(state.generator.as_ref(), &request.text).await?;
    Ok(Json(analysis))
}
