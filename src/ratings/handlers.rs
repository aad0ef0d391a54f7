use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    repo,
    repo_types::{Rating, RatingInput, RatingWithAuthor},
    services,
};
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/recipes/:id/ratings",
            get(list_ratings).post(add_rating).put(update_rating),
        )
        .route("/recipes/:id/ratings/mine", get(my_rating))
        .route("/recipes/:id/ratings/:rating_id", delete(delete_rating))
}

#[instrument(skip(state))]
pub async fn list_ratings(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<Vec<RatingWithAuthor>>> {
    Ok(Json(repo::list_for_recipe(&state.db, recipe_id).await?))
}

#[instrument(skip(state))]
pub async fn my_rating(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<Option<Rating>>> {
    Ok(Json(repo::find_for_user(&state.db, user_id, recipe_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn add_rating(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(recipe_id): Path<Uuid>,
    Json(payload): Json<RatingInput>,
) -> AppResult<Json<Rating>> {
    Ok(Json(services::add_rating(&state, user_id, recipe_id, payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_rating(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(recipe_id): Path<Uuid>,
    Json(payload): Json<RatingInput>,
) -> AppResult<Json<Rating>> {
    Ok(Json(services::update_rating(&state, user_id, recipe_id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_rating(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((recipe_id, rating_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    services::delete_rating(&state, user_id, rating_id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{app::build_app, auth::{dto::JwtKeys, repo_types::Role}, state::AppState};
    use axum::{body::Body, extract::FromRef, http::{Request, StatusCode}};
    use tower::ServiceExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn out_of_range_rating_is_rejected() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state)
            .sign_access(Uuid::new_v4(), Role::User)
            .unwrap();
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/recipes/{}/ratings", Uuid::new_v4()))
                    .header("content-type", "application/json")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::from(r#"{"rating":9}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
