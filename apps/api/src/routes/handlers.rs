use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::job::JobRow;
use crate::models::profile::ProfileRow;
use crate::models::run::{RunRow, RunSummary};
use crate::pipeline::run_pipeline;
use crate::resume::{derive_keywords, ResumeContext};
use crate::state::AppState;
use crate::store::runs::DashboardStats;
use crate::store::{jobs, profiles, runs};

#[derive(Deserialize)]
pub struct CreateProfileRequest {
    pub name: String,
    pub email: String,
}

/// POST /api/v1/profiles
pub async fn handle_create_profile(
    State(state): State<AppState>,
    Json(req): Json<CreateProfileRequest>,
) -> Result<Json<ProfileRow>, AppError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() {
        return Err(AppError::Validation(
            "name and email are required".to_string(),
        ));
    }
    let profile = profiles::create_profile(&state.db, req.name.trim(), req.email.trim()).await?;
    Ok(Json(profile))
}

/// GET /api/v1/profiles
pub async fn handle_list_profiles(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProfileRow>>, AppError> {
    Ok(Json(profiles::list_profiles(&state.db).await?))
}

#[derive(Deserialize)]
pub struct RunRequest {
    /// Full resume text, already extracted upstream.
    pub resume_text: String,
    /// Skills section entries, if the extractor separated them out.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Pre-derived keyword set; derived from text + skills when absent.
    pub keywords: Option<Vec<String>>,
}

/// POST /api/v1/profiles/:id/run
/// The external scheduler's entry point: runs the pipeline once.
pub async fn handle_run_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<i64>,
    Json(req): Json<RunRequest>,
) -> Result<Json<RunSummary>, AppError> {
    let profile = profiles::get_profile(&state.db, profile_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {profile_id} not found")))?;
    if !profile.enabled {
        return Err(AppError::Validation(format!(
            "Profile {profile_id} is disabled"
        )));
    }

    let keywords = req
        .keywords
        .unwrap_or_else(|| derive_keywords(&req.skills, &req.resume_text));
    let resume = ResumeContext::new(req.resume_text, keywords);

    let summary = run_pipeline(
        &state.db,
        &state.sources,
        state.embedder.as_ref(),
        state.notifier.as_ref(),
        &state.config.matching,
        &profile,
        &resume,
    )
    .await?;
    Ok(Json(summary))
}

#[derive(Deserialize)]
pub struct MatchesQuery {
    pub days: Option<i64>,
    pub min_score: Option<f64>,
}

/// GET /api/v1/profiles/:id/matches
pub async fn handle_profile_matches(
    State(state): State<AppState>,
    Path(profile_id): Path<i64>,
    Query(params): Query<MatchesQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    let days = params.days.unwrap_or(7);
    let min_score = params
        .min_score
        .unwrap_or(state.config.matching.threshold);
    let matches = jobs::recent_jobs(&state.db, profile_id, days, min_score).await?;
    Ok(Json(matches))
}

/// GET /api/v1/profiles/:id/runs
pub async fn handle_run_history(
    State(state): State<AppState>,
    Path(profile_id): Path<i64>,
) -> Result<Json<Vec<RunRow>>, AppError> {
    Ok(Json(runs::run_history(&state.db, profile_id, 10).await?))
}

/// GET /api/v1/stats
pub async fn handle_stats(
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(runs::dashboard_stats(&state.db).await?))
}
