use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{ProfileResponse, SetThemeRequest, ThemeResponse, UpdateProfileRequest},
    services,
};
use crate::{
    activity::ClientInfo,
    auth::{repo_types::User, AuthUser, MaybeAuthUser},
    error::{AppError, AppResult},
    images::services::read_files,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route(
            "/profile/avatar",
            post(update_avatar).layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
        .route("/theme", get(get_theme))
        .route("/theme/set", post(set_theme))
}

#[instrument(skip(state, headers))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    headers: HeaderMap,
) -> AppResult<Json<ProfileResponse>> {
    let user = services::load_user(&state, user_id).await?;
    let stats = services::user_stats(&state, user_id).await?;
    let theme = services::resolve_theme(&state, &headers, Some(user_id)).await;
    Ok(Json(ProfileResponse { user, stats, theme }))
}

#[instrument(skip(state, client, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    client: ClientInfo,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<User>> {
    Ok(Json(services::update_profile(&state, user_id, &payload, &client).await?))
}

#[instrument(skip(state, mp))]
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> AppResult<Json<User>> {
    let file = read_files(mp)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::bad_request("No file uploaded"))?;
    Ok(Json(services::update_avatar(&state, user_id, file).await?))
}

#[instrument(skip(state, headers))]
pub async fn get_theme(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    headers: HeaderMap,
) -> Json<ThemeResponse> {
    let theme = services::resolve_theme(&state, &headers, user).await;
    Json(ThemeResponse { theme })
}

#[instrument(skip(state, payload))]
pub async fn set_theme(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Json(payload): Json<SetThemeRequest>,
) -> AppResult<impl IntoResponse> {
    let theme = services::set_theme(&state, user, &payload.theme).await?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, services::theme_cookie(theme))]),
        Json(ThemeResponse { theme }),
    ))
}

#[cfg(test)]
mod tests {
    use crate::{app::build_app, state::AppState};
    use axum::{body::Body, http::{header, Request, StatusCode}};
    use tower::ServiceExt;

    #[tokio::test]
    async fn anonymous_theme_set_returns_cookie() {
        let res = build_app(AppState::fake())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/theme/set")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"theme":"DARK"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("fv_theme=dark"));
    }

    #[tokio::test]
    async fn theme_read_from_cookie() {
        let res = build_app(AppState::fake())
            .oneshot(
                Request::builder()
                    .uri("/theme")
                    .header("cookie", "fv_theme=light")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"theme":"light"}"#);
    }

    #[tokio::test]
    async fn profile_requires_auth() {
        let res = build_app(AppState::fake())
            .oneshot(Request::builder().uri("/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
