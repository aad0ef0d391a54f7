use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{Message, ReportActionRequest},
    repo,
    users::invalidate_dashboard,
};
use crate::{
    auth::StaffUser,
    error::{AppError, AppResult},
    pagination::{PageQuery, Paged, DEFAULT_PAGE_SIZE},
    reports::{
        repo as reports_repo,
        repo_types::{ReportRow, ReportStatus, ReportTarget},
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports", get(list_reports))
        .route("/reports/:id", get(report_details).delete(delete_report))
        .route("/reports/:id/action", post(report_action))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    #[serde(alias = "pageSize")]
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ReportView {
    #[serde(flatten)]
    pub report: ReportRow,
    pub target_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportList {
    #[serde(flatten)]
    pub page: Paged<ReportView>,
    pub status: String,
    pub pending_count: i64,
}

/// `Resolve` and `Dismiss` close a report; anything else is rejected.
pub fn parse_action(action: &str) -> AppResult<ReportStatus> {
    match action.trim().to_ascii_lowercase().as_str() {
        "resolve" => Ok(ReportStatus::Resolved),
        "dismiss" => Ok(ReportStatus::Dismissed),
        _ => Err(AppError::bad_request("Action must be Resolve or Dismiss")),
    }
}

/// Display name and admin link for a report target; deleted targets are labelled as such.
async fn resolve_target(st: &AppState, row: &ReportRow) -> anyhow::Result<(String, Option<String>)> {
    let Some(target) = ReportTarget::parse(&row.target_type) else {
        return Ok((format!("Unknown target ({})", row.target_type), None));
    };
    let id = row.target_id;
    let resolved = match target {
        ReportTarget::Recipe => repo::recipe_title(&st.db, id)
            .await?
            .map_or(("Recipe deleted".to_string(), None), |title| {
                (title, Some(format!("/admin/recipes/{id}")))
            }),
        ReportTarget::User => repo::username(&st.db, id)
            .await?
            .map_or(("User deleted".to_string(), None), |name| {
                (name, Some(format!("/admin/users/{id}")))
            }),
        ReportTarget::Comment | ReportTarget::Rating => repo::rating_recipe(&st.db, id)
            .await?
            .map_or(("Comment deleted".to_string(), None), |(recipe_id, title)| {
                (
                    format!("Comment on recipe: {title}"),
                    Some(format!("/admin/recipes/{recipe_id}")),
                )
            }),
    };
    Ok(resolved)
}

async fn view(st: &AppState, report: ReportRow) -> anyhow::Result<ReportView> {
    let (target_name, target_link) = resolve_target(st, &report).await?;
    Ok(ReportView {
        report,
        target_name,
        target_link,
    })
}

#[instrument(skip(state))]
pub async fn list_reports(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Query(q): Query<ReportQuery>,
) -> AppResult<Json<ReportList>> {
    let filter = q.status.as_deref().and_then(ReportStatus::parse_filter);
    let page = PageQuery {
        page: q.page.unwrap_or(1),
        page_size: q.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    };
    let (rows, total) = reports_repo::list(&state.db, filter, page.limit(), page.offset()).await?;
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(view(&state, row).await?);
    }
    let pending_count = reports_repo::pending_count(&state.db).await?;
    Ok(Json(ReportList {
        page: Paged::new(items, &page, total),
        status: filter.map_or("All", ReportStatus::as_str).to_string(),
        pending_count,
    }))
}

#[instrument(skip(state))]
pub async fn report_details(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReportView>> {
    let row = reports_repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Report not found"))?;
    Ok(Json(view(&state, row).await?))
}

#[instrument(skip(state, payload))]
pub async fn report_action(
    State(state): State<AppState>,
    StaffUser(moderator): StaffUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReportActionRequest>,
) -> AppResult<Json<Message>> {
    let status = parse_action(&payload.action)?;
    if !reports_repo::close(&state.db, id, status, moderator).await? {
        return Err(AppError::not_found("Report not found"));
    }
    invalidate_dashboard(&state).await;
    info!(report_id = %id, %moderator, status = status.as_str(), "report closed");
    Ok(Json(Message::new(format!("Report {}", status.as_str().to_lowercase()))))
}

#[instrument(skip(state))]
pub async fn delete_report(
    State(state): State<AppState>,
    StaffUser(moderator): StaffUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Message>> {
    if !reports_repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("Report not found"));
    }
    invalidate_dashboard(&state).await;
    info!(report_id = %id, %moderator, "report deleted");
    Ok(Json(Message::new("Report deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::build_app,
        auth::{repo_types::Role, services::JwtKeys},
    };
    use axum::{
        body::Body,
        extract::FromRef,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[test]
    fn actions() {
        assert_eq!(parse_action("Resolve").unwrap(), ReportStatus::Resolved);
        assert_eq!(parse_action(" dismiss ").unwrap(), ReportStatus::Dismissed);
        assert!(matches!(parse_action("Escalate"), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn unknown_action_is_rejected_before_lookup() {
        let state = AppState::fake();
        let t = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4(), Role::Moderator).unwrap();
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/admin/reports/{}/action", Uuid::new_v4()))
                    .header("authorization", format!("Bearer {t}"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"action":"Escalate"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn listing_requires_a_token() {
        let res = build_app(AppState::fake())
            .oneshot(Request::builder().uri("/admin/reports").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
