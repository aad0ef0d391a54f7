use anyhow::Context;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{CreateTagRequest, CreateTagResponse},
    repo,
    repo_types::Tag,
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tags/list", get(list_tags))
        .route("/api/tags/create", post(create_tag))
}

#[instrument(skip(state))]
pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Vec<Tag>>> {
    Ok(Json(repo::list_all(&state.db).await?))
}

/// Returns the existing tag when one with the same name (any case) is already there.
#[instrument(skip(state, payload))]
pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateTagRequest>,
) -> AppResult<Json<CreateTagResponse>> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Tag name is required"));
    }

    if let Some(tag) = repo::insert_if_absent(&state.db, name).await? {
        info!(%user_id, tag_id = %tag.id, name = %tag.name, "tag created");
        return Ok(Json(CreateTagResponse {
            success: true,
            message: None,
            tag,
        }));
    }

    let tag = repo::find_by_name(&state.db, name, None)
        .await?
        .context("tag missing after insert conflict")?;
    Ok(Json(CreateTagResponse {
        success: true,
        message: Some("Tag already exists".into()),
        tag,
    }))
}

#[cfg(test)]
mod tests {
    use crate::{app::build_app, auth::{dto::JwtKeys, repo_types::Role}, state::AppState};
    use axum::{body::Body, extract::FromRef, http::{Request, StatusCode}};
    use tower::ServiceExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn create_requires_auth() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tags/create")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"vegan"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state)
            .sign_access(Uuid::new_v4(), Role::User)
            .unwrap();
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tags/create")
                    .header("content-type", "application/json")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::from(r#"{"name":"   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
