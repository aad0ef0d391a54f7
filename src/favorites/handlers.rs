use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use super::{repo, services};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    recipes::repo_types::RecipeCard,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(list_favorites))
        .route(
            "/favorites/:recipe_id",
            get(is_favorite).post(add_favorite).delete(remove_favorite),
        )
        .route("/favorites/:recipe_id/toggle", post(toggle_favorite))
}

#[derive(Debug, Serialize)]
pub struct FavoriteState {
    pub recipe_id: Uuid,
    pub is_favorite: bool,
}

#[instrument(skip(state))]
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<RecipeCard>>> {
    Ok(Json(repo::list_for_user(&state.db, user_id).await?))
}

#[instrument(skip(state))]
pub async fn is_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<FavoriteState>> {
    let is_favorite = repo::exists(&state.db, user_id, recipe_id).await?;
    Ok(Json(FavoriteState { recipe_id, is_favorite }))
}

#[instrument(skip(state))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<FavoriteState>)> {
    services::add_favorite(&state, user_id, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(FavoriteState { recipe_id, is_favorite: true })))
}

#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !services::remove_favorite(&state, user_id, recipe_id).await? {
        return Err(AppError::not_found("Favorite not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<FavoriteState>> {
    let is_favorite = services::toggle_favorite(&state, user_id, recipe_id).await?;
    Ok(Json(FavoriteState { recipe_id, is_favorite }))
}

#[cfg(test)]
mod tests {
    use crate::{app::build_app, state::AppState};
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;

    #[tokio::test]
    async fn favorites_require_auth() {
        let res = build_app(AppState::fake())
            .oneshot(Request::builder().uri("/favorites").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
