use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{AddItemRequest, CreateFridgeRequest, CreatedItem, ExpiringQuery, FridgeItemView, FridgeView},
    services,
};
use crate::{auth::AuthUser, error::AppResult, recipes::repo_types::RecipeCard, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/fridges", get(list_fridges).post(create_fridge))
        .route("/fridges/:id", delete(delete_fridge))
        .route("/fridges/:id/items", post(add_item))
        .route("/fridges/:id/items/:item_id", delete(remove_item))
        .route("/fridges/:id/expiring", get(expiring_soon))
        .route("/fridges/:id/suggestions", get(suggestions))
}

#[instrument(skip(state))]
pub async fn list_fridges(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<FridgeView>>> {
    Ok(Json(services::list_fridges(&state, user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_fridge(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateFridgeRequest>,
) -> AppResult<(StatusCode, Json<FridgeView>)> {
    let fridge = services::create_fridge(&state, user_id, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(fridge)))
}

#[instrument(skip(state))]
pub async fn delete_fridge(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_fridge(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddItemRequest>,
) -> AppResult<(StatusCode, Json<CreatedItem>)> {
    let item_id = services::add_item(&state, user_id, id, payload).await?;
    Ok((StatusCode::CREATED, Json(CreatedItem { id: item_id })))
}

#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    services::remove_item(&state, user_id, id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn expiring_soon(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Query(q): Query<ExpiringQuery>,
) -> AppResult<Json<Vec<FridgeItemView>>> {
    Ok(Json(services::expiring_soon(&state, user_id, id, q.days).await?))
}

#[instrument(skip(state))]
pub async fn suggestions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<RecipeCard>>> {
    Ok(Json(services::recipe_suggestions(&state, user_id, id).await?))
}

#[cfg(test)]
mod tests {
    use crate::{app::build_app, auth::{dto::JwtKeys, repo_types::Role}, state::AppState};
    use axum::{body::Body, extract::FromRef, http::{Request, StatusCode}};
    use tower::ServiceExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn blank_fridge_name_is_rejected() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state)
            .sign_access(Uuid::new_v4(), Role::User)
            .unwrap();
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/fridges")
                    .header("content-type", "application/json")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::from(r#"{"name":"  "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn huge_day_offsets_get_400() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state)
            .sign_access(Uuid::new_v4(), Role::User)
            .unwrap();
        let app = build_app(state);
        let fridge = Uuid::new_v4();

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/fridges/{fridge}/items"))
                    .header("content-type", "application/json")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::from(
                        r#"{"ingredient_name":"Milk","days_to_expire":9223372036854775807}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = app
            .oneshot(
                Request::builder()
                    .uri(format!("/fridges/{fridge}/expiring?days=9223372036854775807"))
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
