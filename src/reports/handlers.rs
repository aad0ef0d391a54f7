use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{repo, repo_types::ReportTarget};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub const REASON_MAX: usize = 500;

pub fn routes() -> Router<AppState> {
    Router::new().route("/reports", post(create_report))
}

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub target_type: String,
    pub target_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedReport {
    pub id: Uuid,
    pub status: &'static str,
}

pub(crate) fn validate(req: &CreateReportRequest) -> AppResult<(ReportTarget, Option<&str>)> {
    let target = ReportTarget::parse(&req.target_type)
        .ok_or_else(|| AppError::bad_request("target_type must be Recipe, Comment, Rating or User"))?;
    let reason = req.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
    if reason.is_some_and(|r| r.chars().count() > REASON_MAX) {
        return Err(AppError::bad_request("Reason must be at most 500 characters"));
    }
    Ok((target, reason))
}

#[instrument(skip(state, payload))]
pub async fn create_report(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateReportRequest>,
) -> AppResult<(StatusCode, Json<CreatedReport>)> {
    let (target, reason) = validate(&payload)?;
    let id = repo::insert(&state.db, user_id, target, payload.target_id, reason).await?;
    info!(report_id = %id, reporter = %user_id, target = target.as_str(), target_id = %payload.target_id, "report filed");
    Ok((StatusCode::CREATED, Json(CreatedReport { id, status: "Pending" })))
}
