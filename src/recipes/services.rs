use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{AddIngredientRequest, AddStepRequest, IngredientLine, RecipeDetails, ViewerRating},
    repo,
    repo_types::{Recipe, RecipeCard, RecipeIngredientRow, RecipeInput, Step},
};
use crate::{
    activity::{self, ClientInfo},
    auth::repo_types::User,
    cache::HOME_KEY,
    error::{AppError, AppResult},
    favorites, images,
    images::services::UploadItem,
    ingredients::{self, repo_types::Nutrition},
    ratings, tags,
    state::AppState,
};

pub const TITLE_MAX: usize = 200;
const THUMB_MAX: u32 = 1200;

pub fn validate_input(input: &RecipeInput) -> AppResult<()> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("Title is required"));
    }
    if title.chars().count() > TITLE_MAX {
        return Err(AppError::bad_request("Title must be at most 200 characters"));
    }
    let negative = [input.servings, input.prep_time_minutes, input.cook_time_minutes]
        .into_iter()
        .flatten()
        .any(|v| v < 0);
    if negative {
        return Err(AppError::bad_request("Servings and times must not be negative"));
    }
    Ok(())
}

/// Loads a recipe the user is allowed to modify.
pub async fn owned_recipe(st: &AppState, recipe_id: Uuid, user_id: Uuid) -> AppResult<Recipe> {
    let recipe = repo::find_by_id(&st.db, recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;
    if recipe.user_id != user_id {
        warn!(%recipe_id, %user_id, "recipe modification by non-owner");
        return Err(AppError::forbidden("Not the owner of this recipe"));
    }
    Ok(recipe)
}

pub async fn create_recipe(
    st: &AppState,
    owner: Uuid,
    input: RecipeInput,
    client: &ClientInfo,
) -> AppResult<Recipe> {
    validate_input(&input)?;
    let recipe = repo::insert(&st.db, owner, &input).await?;
    st.cache.remove(HOME_KEY).await;
    activity::record(&st.db, owner, "CreateRecipe", client).await;
    info!(recipe_id = %recipe.id, user_id = %owner, "recipe created");
    Ok(recipe)
}

pub async fn list_user_recipes(st: &AppState, owner: Uuid) -> AppResult<Vec<RecipeCard>> {
    Ok(repo::list_by_user(&st.db, owner).await?)
}

pub async fn update_recipe(
    st: &AppState,
    recipe_id: Uuid,
    user_id: Uuid,
    input: RecipeInput,
) -> AppResult<Recipe> {
    validate_input(&input)?;
    owned_recipe(st, recipe_id, user_id).await?;
    let recipe = repo::update(&st.db, recipe_id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;
    st.cache.remove(HOME_KEY).await;
    info!(%recipe_id, %user_id, "recipe updated");
    Ok(recipe)
}

/// Removes the recipe, its children and its stored thumbnail.
pub async fn remove_recipe(st: &AppState, recipe: &Recipe) -> AppResult<()> {
    if !repo::delete(&st.db, recipe.id).await? {
        return Err(AppError::not_found("Recipe not found"));
    }
    images::services::delete_by_url(st, recipe.image_url.as_deref()).await;
    st.cache.remove(HOME_KEY).await;
    Ok(())
}

pub async fn delete_recipe(st: &AppState, recipe_id: Uuid, user_id: Uuid) -> AppResult<()> {
    let recipe = owned_recipe(st, recipe_id, user_id).await?;
    remove_recipe(st, &recipe).await?;
    info!(%recipe_id, %user_id, "recipe deleted");
    Ok(())
}

pub async fn upload_thumbnail(
    st: &AppState,
    recipe_id: Uuid,
    user_id: Uuid,
    file: UploadItem,
) -> AppResult<Recipe> {
    let recipe = owned_recipe(st, recipe_id, user_id).await?;
    let stored =
        images::services::store_resized(st, "recipe-thumbs", file, THUMB_MAX, THUMB_MAX).await?;
    repo::set_image_url(&st.db, recipe_id, Some(&stored.url)).await?;
    images::services::delete_by_url(st, recipe.image_url.as_deref()).await;
    st.cache.remove(HOME_KEY).await;
    repo::find_by_id(&st.db, recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found"))
}

pub fn ingredient_lines(rows: Vec<RecipeIngredientRow>) -> (Vec<IngredientLine>, Nutrition) {
    let lines: Vec<IngredientLine> = rows
        .into_iter()
        .map(|r| {
            let quantity = r.quantity.unwrap_or(0.0);
            IngredientLine {
                id: r.id,
                ingredient_id: r.ingredient_id,
                name: r.ingredient_name,
                quantity,
                unit: r.unit,
                nutrition: Nutrition::scaled(
                    quantity,
                    r.default_calories,
                    r.default_protein,
                    r.default_fat,
                    r.default_carbs,
                ),
            }
        })
        .collect();
    let totals = lines.iter().map(|l| l.nutrition).sum();
    (lines, totals)
}

pub async fn recipe_details(
    st: &AppState,
    recipe_id: Uuid,
    viewer: Option<Uuid>,
) -> AppResult<RecipeDetails> {
    let recipe = repo::find_by_id(&st.db, recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;

    let (lines, totals) = ingredient_lines(repo::ingredients(&st.db, recipe_id).await?);
    let steps = repo::steps(&st.db, recipe_id).await?;
    let tags = repo::tags(&st.db, recipe_id).await?;
    let stats = repo::stats(&st.db, recipe_id).await?;
    let author = User::find_by_id(&st.db, recipe.user_id)
        .await?
        .map(|u| u.username)
        .unwrap_or_else(|| recipe.user_id.to_string());

    let (is_favorite, my_rating) = match viewer {
        Some(uid) => (
            favorites::repo::exists(&st.db, uid, recipe_id).await?,
            ratings::repo::find_for_user(&st.db, uid, recipe_id)
                .await?
                .map(|r| ViewerRating {
                    id: r.id,
                    rating: r.rating,
                    comment: r.comment,
                }),
        ),
        None => (false, None),
    };

    Ok(RecipeDetails {
        recipe,
        author,
        ingredients: lines,
        totals,
        steps,
        tags,
        avg_rating: stats.avg_rating,
        rating_count: stats.rating_count,
        favorite_count: stats.favorite_count,
        is_favorite,
        my_rating,
    })
}

pub async fn add_ingredient(
    st: &AppState,
    recipe_id: Uuid,
    user_id: Uuid,
    req: AddIngredientRequest,
) -> AppResult<Uuid> {
    owned_recipe(st, recipe_id, user_id).await?;
    let quantity = req.quantity.unwrap_or(1.0);
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(AppError::bad_request("Quantity must be a non-negative number"));
    }

    let ingredient = match (req.ingredient_id, req.ingredient_name.as_deref().map(str::trim)) {
        (Some(id), _) => ingredients::repo::find_by_id(&st.db, id)
            .await?
            .ok_or_else(|| AppError::not_found("Ingredient not found"))?,
        (None, Some(name)) if !name.is_empty() => {
            ingredients::repo::find_or_create(&st.db, name).await?
        }
        _ => return Err(AppError::bad_request("ingredient_id or ingredient_name is required")),
    };

    let unit = req
        .unit
        .filter(|u| !u.trim().is_empty())
        .or_else(|| ingredient.default_unit.clone());
    let nutrition = ingredient.nutrition_for(quantity);

    let mut tx = st.db.begin().await?;
    let line_id = repo::insert_ingredient_tx(
        &mut tx,
        recipe_id,
        ingredient.id,
        quantity,
        unit.as_deref(),
        nutrition,
    )
    .await?;
    repo::recompute_totals_tx(&mut tx, recipe_id).await?;
    tx.commit().await?;

    info!(%recipe_id, ingredient_id = %ingredient.id, %line_id, "ingredient added to recipe");
    Ok(line_id)
}

pub async fn remove_ingredient(
    st: &AppState,
    recipe_id: Uuid,
    user_id: Uuid,
    line_id: Uuid,
) -> AppResult<()> {
    owned_recipe(st, recipe_id, user_id).await?;
    let mut tx = st.db.begin().await?;
    if !repo::delete_ingredient_tx(&mut tx, recipe_id, line_id).await? {
        return Err(AppError::not_found("Ingredient line not found"));
    }
    repo::recompute_totals_tx(&mut tx, recipe_id).await?;
    tx.commit().await?;
    info!(%recipe_id, %line_id, "ingredient removed from recipe");
    Ok(())
}

pub async fn add_tag(st: &AppState, recipe_id: Uuid, user_id: Uuid, tag_id: Uuid) -> AppResult<()> {
    owned_recipe(st, recipe_id, user_id).await?;
    if tags::repo::find_by_id(&st.db, tag_id).await?.is_none() {
        return Err(AppError::not_found("Tag not found"));
    }
    repo::add_tag(&st.db, recipe_id, tag_id).await?;
    st.cache.remove(HOME_KEY).await;
    Ok(())
}

/// Missing links are ignored.
pub async fn remove_tag(st: &AppState, recipe_id: Uuid, user_id: Uuid, link_id: Uuid) -> AppResult<()> {
    owned_recipe(st, recipe_id, user_id).await?;
    if repo::remove_tag(&st.db, recipe_id, link_id).await? {
        st.cache.remove(HOME_KEY).await;
    }
    Ok(())
}

pub async fn add_step(
    st: &AppState,
    recipe_id: Uuid,
    user_id: Uuid,
    req: AddStepRequest,
) -> AppResult<Step> {
    owned_recipe(st, recipe_id, user_id).await?;
    let instruction = req.instruction.trim();
    if instruction.is_empty() {
        return Err(AppError::bad_request("Instruction is required"));
    }
    if req.step_number.is_some_and(|n| n < 1) {
        return Err(AppError::bad_request("Step number must be positive"));
    }
    let step = repo::add_step(
        &st.db,
        recipe_id,
        req.step_number,
        instruction,
        req.image_url.as_deref(),
    )
    .await?;
    repo::touch(&st.db, recipe_id).await?;
    Ok(step)
}

pub async fn remove_step(st: &AppState, recipe_id: Uuid, user_id: Uuid, step_id: Uuid) -> AppResult<()> {
    owned_recipe(st, recipe_id, user_id).await?;
    if !repo::remove_step(&st.db, recipe_id, step_id).await? {
        return Err(AppError::not_found("Step not found"));
    }
    repo::touch(&st.db, recipe_id).await?;
    Ok(())
}

/// `true` when the recipe was created within `days` or never updated.
pub fn is_pending_review(
    created: OffsetDateTime,
    updated: Option<OffsetDateTime>,
    now: OffsetDateTime,
    days: i64,
) -> bool {
    updated.is_none() || created >= now - time::Duration::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(qty: Option<f64>, kcal: Option<f64>) -> RecipeIngredientRow {
        RecipeIngredientRow {
            id: Uuid::new_v4(),
            recipe_id: Uuid::new_v4(),
            ingredient_id: Uuid::new_v4(),
            ingredient_name: "Flour".into(),
            quantity: qty,
            unit: Some("g".into()),
            default_calories: kcal,
            default_protein: Some(0.1),
            default_fat: None,
            default_carbs: Some(0.7),
        }
    }

    #[test]
    fn lines_and_totals() {
        let (lines, totals) = ingredient_lines(vec![row(Some(100.0), Some(3.6)), row(None, Some(5.0)), row(Some(10.0), None)]);
        assert_eq!(lines.len(), 3);
        assert!((lines[0].nutrition.calories - 360.0).abs() < 1e-9);
        assert_eq!(lines[1].quantity, 0.0);
        assert_eq!(lines[2].nutrition.calories, 0.0);
        assert!((totals.calories - 360.0).abs() < 1e-9);
        assert!((totals.carbs - 77.0).abs() < 1e-9);
        assert_eq!(totals.fat, 0.0);
    }

    #[test]
    fn title_validation() {
        let mut input = RecipeInput { title: "  ".into(), ..Default::default() };
        assert!(validate_input(&input).is_err());
        input.title = "x".repeat(TITLE_MAX + 1);
        assert!(validate_input(&input).is_err());
        input.title = "Pancakes".into();
        assert!(validate_input(&input).is_ok());
        input.servings = Some(-1);
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn pending_review_window() {
        let now = OffsetDateTime::now_utc();
        let old = now - time::Duration::days(30);
        assert!(is_pending_review(old, None, now, 7));
        assert!(!is_pending_review(old, Some(old), now, 7));
        assert!(is_pending_review(now - time::Duration::days(2), Some(now), now, 7));
    }
}
