use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::services::{self, StoredFile};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/images/upload", post(upload))
        .route("/api/images", delete(remove))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_prefix() -> String {
    "uploads".into()
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub files: Vec<StoredFile>,
}

#[instrument(skip(state, mp))]
pub async fn upload(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<UploadQuery>,
    mp: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let items = services::read_files(mp).await?;
    if items.is_empty() {
        return Err(AppError::bad_request("No files uploaded"));
    }
    // validate all first so a bad file does not leave partial uploads behind
    for item in &items {
        services::validate(item)?;
    }
    let mut files = Vec::with_capacity(items.len());
    for item in items {
        files.push(services::store(&state, &q.prefix, item).await?);
    }
    info!(%user_id, count = files.len(), prefix = %q.prefix, "images uploaded");
    Ok(Json(UploadResponse { files }))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<DeleteQuery>,
) -> AppResult<StatusCode> {
    let path = q.path.trim();
    if path.is_empty() {
        return Err(AppError::bad_request("path is required"));
    }
    services::delete_by_path(&state, path).await?;
    info!(%user_id, %path, "image deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{app::build_app, auth::{dto::JwtKeys, repo_types::Role}, state::AppState};
    use axum::{body::Body, extract::FromRef, http::{Request, StatusCode}};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn bearer(state: &AppState) -> String {
        let token = JwtKeys::from_ref(state)
            .sign_access(Uuid::new_v4(), Role::User)
            .unwrap();
        format!("Bearer {token}")
    }

    const BOUNDARY: &str = "XBOUNDARYX";

    fn multipart(ct: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"a\"\r\nContent-Type: {ct}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    #[tokio::test]
    async fn upload_stores_and_returns_urls() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/images/upload?prefix=recipe-steps")
                    .header("authorization", auth)
                    .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
                    .body(Body::from(multipart("image/png", b"png-bytes")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let path = json["files"][0]["path"].as_str().unwrap();
        assert!(path.starts_with("recipe-steps/") && path.ends_with(".png"));
        assert!(json["files"][0]["url"].as_str().unwrap().ends_with(path));
    }

    #[tokio::test]
    async fn upload_rejects_unsupported_type() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/images/upload")
                    .header("authorization", auth)
                    .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
                    .body(Body::from(multipart("image/gif", b"GIF89a")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_requires_path() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/images")
                    .header("authorization", auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
