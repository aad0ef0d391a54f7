use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{ListQuery, Message},
    tags::clean_name,
};
use crate::{
    auth::StaffUser,
    error::{is_unique_violation_any, AppError, AppResult},
    ingredients::{
        repo,
        repo_types::{Ingredient, IngredientInput},
    },
    pagination::Paged,
    state::AppState,
};

pub const INGREDIENT_NAME_MAX: usize = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients).post(create_ingredient))
        .route(
            "/ingredients/:id",
            get(ingredient_details).put(edit_ingredient).delete(delete_ingredient),
        )
}

#[derive(Debug, Serialize)]
pub struct IngredientDetails {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub recipe_count: i64,
    pub fridge_count: i64,
}

fn validate(mut input: IngredientInput) -> AppResult<IngredientInput> {
    input.name = clean_name(&input.name, INGREDIENT_NAME_MAX, "Ingredient")?;
    let nutrition = [
        input.default_calories,
        input.default_protein,
        input.default_fat,
        input.default_carbs,
    ];
    if nutrition.into_iter().flatten().any(|v| !v.is_finite() || v < 0.0) {
        return Err(AppError::bad_request("Nutrition values must be non-negative"));
    }
    input.default_unit = input.default_unit.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
    input.image_url = input.image_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
    Ok(input)
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paged<Ingredient>>> {
    let page = q.paging();
    let (rows, total) = repo::list_page(&state.db, q.search(), page.limit(), page.offset()).await?;
    Ok(Json(Paged::new(rows, &page, total)))
}

#[instrument(skip(state, payload))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    StaffUser(moderator): StaffUser,
    Json(payload): Json<IngredientInput>,
) -> AppResult<(StatusCode, Json<Ingredient>)> {
    let input = validate(payload)?;
    if repo::find_by_name(&state.db, &input.name, None).await?.is_some() {
        warn!(name = %input.name, "duplicate ingredient");
        return Err(AppError::conflict("An ingredient with this name already exists"));
    }
    let ingredient = repo::create(&state.db, &input).await.map_err(|e| {
        if is_unique_violation_any(&e) {
            AppError::conflict("An ingredient with this name already exists")
        } else {
            AppError::Internal(e)
        }
    })?;
    info!(ingredient_id = %ingredient.id, %moderator, name = %ingredient.name, "ingredient created");
    Ok((StatusCode::CREATED, Json(ingredient)))
}

#[instrument(skip(state))]
pub async fn ingredient_details(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<IngredientDetails>> {
    let ingredient = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Ingredient not found"))?;
    let (recipe_count, fridge_count) = repo::usage(&state.db, id).await?;
    Ok(Json(IngredientDetails {
        ingredient,
        recipe_count,
        fridge_count,
    }))
}

#[instrument(skip(state, payload))]
pub async fn edit_ingredient(
    State(state): State<AppState>,
    StaffUser(moderator): StaffUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<IngredientInput>,
) -> AppResult<Json<Ingredient>> {
    let input = validate(payload)?;
    if repo::find_by_name(&state.db, &input.name, Some(id)).await?.is_some() {
        warn!(name = %input.name, ingredient_id = %id, "rename collides with existing ingredient");
        return Err(AppError::conflict("An ingredient with this name already exists"));
    }
    let ingredient = repo::update(&state.db, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Ingredient not found"))?;
    info!(ingredient_id = %id, %moderator, "ingredient updated");
    Ok(Json(ingredient))
}

#[instrument(skip(state))]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    StaffUser(moderator): StaffUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Message>> {
    let ingredient = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Ingredient not found"))?;
    let (recipes, fridges) = repo::usage(&state.db, id).await?;
    if recipes > 0 || fridges > 0 {
        return Err(AppError::conflict(format!(
            "Ingredient \"{}\" is used by {recipes} recipe line(s) and {fridges} fridge item(s)",
            ingredient.name
        )));
    }
    repo::delete(&state.db, id).await?;
    info!(ingredient_id = %id, %moderator, "ingredient deleted");
    Ok(Json(Message::new(format!("Ingredient \"{}\" deleted", ingredient.name))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, kcal: Option<f64>) -> IngredientInput {
        IngredientInput {
            name: name.into(),
            default_unit: Some("  ".into()),
            default_calories: kcal,
            ..Default::default()
        }
    }

    #[test]
    fn validation_normalises_and_rejects() {
        let ok = validate(input(" Egg ", Some(1.4))).unwrap();
        assert_eq!(ok.name, "Egg");
        assert_eq!(ok.default_unit, None);
        assert!(validate(input("Egg", Some(-1.0))).is_err());
        assert!(validate(input("Egg", Some(f64::NAN))).is_err());
        assert!(validate(input("", None)).is_err());
    }
}
