use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{ListQuery, Message},
    repo,
    users::invalidate_dashboard,
};
use crate::{
    activity::{self, ClientInfo},
    auth::StaffUser,
    error::{AppError, AppResult},
    pagination::Paged,
    recipes::{
        repo as recipes_repo,
        repo_types::{RecipeCard, RecipeIngredientRow, Step},
        services::{is_pending_review, remove_recipe},
    },
    state::AppState,
};

pub const PENDING_DAYS: i64 = 7;
const FEATURED_MIN_RATINGS: i64 = 5;
const FEATURED_MIN_AVG: f64 = 4.0;
const FEATURED_MIN_FAVORITES: i64 = 10;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/featured", get(featured_recipes))
        .route("/recipes/pending", get(pending_recipes))
        .route("/recipes/:id", get(recipe_details).delete(delete_recipe))
        .route("/recipes/:id/approve", post(approve_recipe))
        .route("/recipes/:id/reject", post(reject_recipe))
}

#[derive(Debug, Serialize)]
pub struct AdminRecipeDetails {
    #[serde(flatten)]
    pub recipe: RecipeCard,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub tags: Vec<String>,
    pub pending_review: bool,
}

/// "Flour - 200 g"; quantity and unit are omitted when missing.
pub fn ingredient_summary(row: &RecipeIngredientRow) -> String {
    let amount = [
        row.quantity.map(|q| q.to_string()),
        row.unit.clone().filter(|u| !u.trim().is_empty()),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");
    if amount.is_empty() {
        row.ingredient_name.clone()
    } else {
        format!("{} - {}", row.ingredient_name, amount)
    }
}

pub fn step_summary(step: &Step) -> String {
    format!("Step {}: {}", step.step_number, step.instruction)
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paged<RecipeCard>>> {
    let page = q.paging();
    let (rows, total) = repo::list_recipes(&state.db, q.search(), page.limit(), page.offset()).await?;
    Ok(Json(Paged::new(rows, &page, total)))
}

#[instrument(skip(state))]
pub async fn featured_recipes(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paged<RecipeCard>>> {
    let page = q.paging();
    let (rows, total) = repo::featured_recipes(
        &state.db,
        FEATURED_MIN_RATINGS,
        FEATURED_MIN_AVG,
        FEATURED_MIN_FAVORITES,
        page.limit(),
        page.offset(),
    )
    .await?;
    Ok(Json(Paged::new(rows, &page, total)))
}

#[instrument(skip(state))]
pub async fn pending_recipes(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paged<RecipeCard>>> {
    let page = q.paging();
    let since = OffsetDateTime::now_utc() - Duration::days(PENDING_DAYS);
    let (rows, total) = repo::pending_recipes(&state.db, since, page.limit(), page.offset()).await?;
    Ok(Json(Paged::new(rows, &page, total)))
}

#[instrument(skip(state))]
pub async fn recipe_details(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AdminRecipeDetails>> {
    let recipe = recipes_repo::find_card(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;
    let ingredients = recipes_repo::ingredients(&state.db, id).await?;
    let steps = recipes_repo::steps(&state.db, id).await?;
    let tags = recipes_repo::tags(&state.db, id).await?;
    let pending_review = is_pending_review(
        recipe.created_at,
        recipe.updated_at,
        OffsetDateTime::now_utc(),
        PENDING_DAYS,
    );
    Ok(Json(AdminRecipeDetails {
        recipe,
        ingredients: ingredients.iter().map(ingredient_summary).collect(),
        steps: steps.iter().map(step_summary).collect(),
        tags: tags.into_iter().map(|t| t.name).collect(),
        pending_review,
    }))
}

async fn moderate(
    st: &AppState,
    moderator: Uuid,
    recipe_id: Uuid,
    action: &str,
    client: &ClientInfo,
) -> AppResult<String> {
    let recipe = recipes_repo::find_by_id(&st.db, recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;
    activity::record(&st.db, moderator, action, client).await;
    invalidate_dashboard(st).await;
    info!(%recipe_id, %moderator, action, title = %recipe.title, "recipe moderated");
    Ok(recipe.title)
}

#[instrument(skip(state, client))]
pub async fn approve_recipe(
    State(state): State<AppState>,
    StaffUser(moderator): StaffUser,
    client: ClientInfo,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Message>> {
    let title = moderate(&state, moderator, id, "ApproveRecipe", &client).await?;
    Ok(Json(Message::new(format!("Recipe \"{title}\" approved"))))
}

#[instrument(skip(state, client))]
pub async fn reject_recipe(
    State(state): State<AppState>,
    StaffUser(moderator): StaffUser,
    client: ClientInfo,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Message>> {
    let title = moderate(&state, moderator, id, "RejectRecipe", &client).await?;
    Ok(Json(Message::new(format!("Recipe \"{title}\" rejected"))))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    StaffUser(moderator): StaffUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Message>> {
    let recipe = recipes_repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;
    remove_recipe(&state, &recipe).await?;
    invalidate_dashboard(&state).await;
    info!(recipe_id = %id, %moderator, "recipe deleted by staff");
    Ok(Json(Message::new("Recipe deleted")))
}
