use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{AddIngredientRequest, AddStepRequest, AddTagRequest, CreatedId, FeedResponse, RecipeDetails},
    repo,
    repo_types::{Recipe, RecipeCard, RecipeInput, Step},
    services,
};
use crate::{
    activity::ClientInfo,
    auth::{AuthUser, MaybeAuthUser},
    error::{AppError, AppResult},
    images::services::read_files,
    pagination::{PageQuery, Paged},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/recipes", get(feed))
        .route("/recipes", post(create_recipe))
        .route("/recipes/mine", get(list_mine))
        .route(
            "/recipes/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route(
            "/recipes/:id/thumbnail",
            post(upload_thumbnail).layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
        .route("/recipes/:id/ingredients", post(add_ingredient))
        .route("/recipes/:id/ingredients/:line_id", delete(remove_ingredient))
        .route("/recipes/:id/tags", post(add_tag))
        .route("/recipes/:id/tags/:link_id", delete(remove_tag))
        .route("/recipes/:id/steps", post(add_step))
        .route("/recipes/:id/steps/:step_id", delete(remove_step))
}

#[instrument(skip(state))]
pub async fn feed(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<FeedResponse>> {
    let (items, total) = repo::list_page(&state.db, q.limit(), q.offset()).await?;
    let page = Paged::new(items, &q, total);
    let has_more = page.page < page.total_pages;
    Ok(Json(FeedResponse { page, has_more }))
}

#[instrument(skip(state))]
pub async fn list_mine(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<RecipeCard>>> {
    Ok(Json(services::list_user_recipes(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RecipeDetails>> {
    Ok(Json(services::recipe_details(&state, id, viewer).await?))
}

#[instrument(skip(state, client, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    client: ClientInfo,
    Json(payload): Json<RecipeInput>,
) -> AppResult<(StatusCode, HeaderMap, Json<Recipe>)> {
    let recipe = services::create_recipe(&state, user_id, payload, &client).await?;
    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/recipes/{}", recipe.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(recipe)))
}

#[instrument(skip(state, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipeInput>,
) -> AppResult<Json<Recipe>> {
    Ok(Json(services::update_recipe(&state, id, user_id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_recipe(&state, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, mp))]
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> AppResult<Json<Recipe>> {
    let file = read_files(mp)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::bad_request("No file uploaded"))?;
    Ok(Json(services::upload_thumbnail(&state, id, user_id, file).await?))
}

#[instrument(skip(state, payload))]
pub async fn add_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddIngredientRequest>,
) -> AppResult<(StatusCode, Json<CreatedId>)> {
    let line_id = services::add_ingredient(&state, id, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(CreatedId { id: line_id })))
}

#[instrument(skip(state))]
pub async fn remove_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    services::remove_ingredient(&state, id, user_id, line_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn add_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddTagRequest>,
) -> AppResult<StatusCode> {
    services::add_tag(&state, id, user_id, payload.tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn remove_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, link_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    services::remove_tag(&state, id, user_id, link_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn add_step(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddStepRequest>,
) -> AppResult<(StatusCode, Json<Step>)> {
    let step = services::add_step(&state, id, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(step)))
}

#[instrument(skip(state))]
pub async fn remove_step(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, step_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    services::remove_step(&state, id, user_id, step_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{app::build_app, auth::{dto::JwtKeys, repo_types::Role}, state::AppState};
    use axum::{body::Body, extract::FromRef, http::{Request, StatusCode}};
    use tower::ServiceExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn create_requires_auth() {
        let res = build_app(AppState::fake())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/recipes")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"title":"Soup"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_validates_title_before_db() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state)
            .sign_access(Uuid::new_v4(), Role::User)
            .unwrap();
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/recipes")
                    .header("content-type", "application/json")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::from(r#"{"title":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_recipe_id_is_rejected() {
        let res = build_app(AppState::fake())
            .oneshot(Request::builder().uri("/recipes/not-a-uuid").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
