use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{
    Recipe, RecipeCard, RecipeIngredientRow, RecipeInput, RecipeStats, RecipeTagRow, Step,
};
use crate::ingredients::repo_types::Nutrition;

const RECIPE_COLUMNS: &str = r#"
    id, user_id, title, description, image_url, servings, prep_time_minutes, cook_time_minutes,
    total_calories, total_protein, total_fat, total_carbs, created_at, updated_at
"#;

/// Card projection over `recipes r`; callers append WHERE/ORDER/LIMIT.
pub(crate) const CARD_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.username AS author, r.title, r.description, r.image_url,
           r.servings, r.prep_time_minutes, r.cook_time_minutes, r.created_at, r.updated_at,
           COALESCE((SELECT AVG(ra.rating)::float8 FROM ratings ra WHERE ra.recipe_id = r.id), 0) AS avg_rating,
           (SELECT COUNT(*) FROM ratings ra WHERE ra.recipe_id = r.id) AS rating_count,
           (SELECT COUNT(*) FROM favorites f WHERE f.recipe_id = r.id) AS favorite_count
    FROM recipes r
    LEFT JOIN users u ON u.id = r.user_id
"#;

pub async fn insert(db: &PgPool, owner: Uuid, input: &RecipeInput) -> anyhow::Result<Recipe> {
    let row = sqlx::query_as::<_, Recipe>(&format!(
        r#"
        INSERT INTO recipes (user_id, title, description, servings, prep_time_minutes, cook_time_minutes,
                             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, now(), now())
        RETURNING {RECIPE_COLUMNS}
        "#
    ))
    .bind(owner)
    .bind(input.title.trim())
    .bind(&input.description)
    .bind(input.servings)
    .bind(input.prep_time_minutes)
    .bind(input.cook_time_minutes)
    .fetch_one(db)
    .await
    .context("insert recipe")?;
    Ok(row)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Recipe>> {
    let row = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find recipe")?;
    Ok(row)
}

pub async fn find_card(db: &PgPool, id: Uuid) -> anyhow::Result<Option<RecipeCard>> {
    let row = sqlx::query_as::<_, RecipeCard>(&format!("{CARD_SELECT} WHERE r.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find recipe card")?;
    Ok(row)
}

pub async fn list_by_user(db: &PgPool, owner: Uuid) -> anyhow::Result<Vec<RecipeCard>> {
    let rows = sqlx::query_as::<_, RecipeCard>(&format!(
        "{CARD_SELECT} WHERE r.user_id = $1 ORDER BY r.updated_at DESC NULLS LAST, r.created_at DESC"
    ))
    .bind(owner)
    .fetch_all(db)
    .await
    .context("list user recipes")?;
    Ok(rows)
}

/// Newest first, for the public infinite-scroll feed.
pub async fn list_page(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<(Vec<RecipeCard>, i64)> {
    let rows = sqlx::query_as::<_, RecipeCard>(&format!(
        "{CARD_SELECT} ORDER BY r.created_at DESC LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list recipes page")?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
        .fetch_one(db)
        .await
        .context("count recipes")?;
    Ok((rows, total))
}

pub async fn update(db: &PgPool, id: Uuid, input: &RecipeInput) -> anyhow::Result<Option<Recipe>> {
    let row = sqlx::query_as::<_, Recipe>(&format!(
        r#"
        UPDATE recipes
        SET title = $2, description = $3, servings = $4, prep_time_minutes = $5,
            cook_time_minutes = $6, updated_at = now()
        WHERE id = $1
        RETURNING {RECIPE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(input.title.trim())
    .bind(&input.description)
    .bind(input.servings)
    .bind(input.prep_time_minutes)
    .bind(input.cook_time_minutes)
    .fetch_optional(db)
    .await
    .context("update recipe")?;
    Ok(row)
}

pub async fn set_image_url(db: &PgPool, id: Uuid, url: Option<&str>) -> anyhow::Result<()> {
    sqlx::query("UPDATE recipes SET image_url = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(url)
        .execute(db)
        .await
        .context("set recipe image")?;
    Ok(())
}

/// Children (ingredients, steps, tags, ratings, favorites) go with it via cascade.
pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete recipe")?;
    Ok(res.rows_affected() > 0)
}

pub async fn ingredients(db: &PgPool, recipe_id: Uuid) -> anyhow::Result<Vec<RecipeIngredientRow>> {
    let rows = sqlx::query_as::<_, RecipeIngredientRow>(
        r#"
        SELECT ri.id, ri.recipe_id, ri.ingredient_id, i.name AS ingredient_name, ri.quantity, ri.unit,
               i.default_calories, i.default_protein, i.default_fat, i.default_carbs
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY i.name
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await
    .context("list recipe ingredients")?;
    Ok(rows)
}

pub async fn steps(db: &PgPool, recipe_id: Uuid) -> anyhow::Result<Vec<Step>> {
    let rows = sqlx::query_as::<_, Step>(
        r#"
        SELECT id, recipe_id, step_number, instruction, image_url
        FROM steps WHERE recipe_id = $1
        ORDER BY step_number
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await
    .context("list recipe steps")?;
    Ok(rows)
}

pub async fn tags(db: &PgPool, recipe_id: Uuid) -> anyhow::Result<Vec<RecipeTagRow>> {
    let rows = sqlx::query_as::<_, RecipeTagRow>(
        r#"
        SELECT rt.id, rt.tag_id, t.name
        FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await
    .context("list recipe tags")?;
    Ok(rows)
}

pub async fn stats(db: &PgPool, recipe_id: Uuid) -> anyhow::Result<RecipeStats> {
    let row = sqlx::query_as::<_, RecipeStats>(
        r#"
        SELECT
            COALESCE((SELECT AVG(rating)::float8 FROM ratings WHERE recipe_id = $1), 0) AS avg_rating,
            (SELECT COUNT(*) FROM ratings WHERE recipe_id = $1) AS rating_count,
            (SELECT COUNT(*) FROM favorites WHERE recipe_id = $1) AS favorite_count
        "#,
    )
    .bind(recipe_id)
    .fetch_one(db)
    .await
    .context("recipe stats")?;
    Ok(row)
}

pub async fn insert_ingredient_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    ingredient_id: Uuid,
    quantity: f64,
    unit: Option<&str>,
    nutrition: Nutrition,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, quantity, unit, calories, protein, fat, carbs)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(recipe_id)
    .bind(ingredient_id)
    .bind(quantity)
    .bind(unit)
    .bind(nutrition.calories)
    .bind(nutrition.protein)
    .bind(nutrition.fat)
    .bind(nutrition.carbs)
    .fetch_one(&mut **tx)
    .await
    .context("insert recipe ingredient")?;
    Ok(id)
}

pub async fn delete_ingredient_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    line_id: Uuid,
) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM recipe_ingredients WHERE id = $1 AND recipe_id = $2")
        .bind(line_id)
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .context("delete recipe ingredient")?;
    Ok(res.rows_affected() > 0)
}

/// Recompute `total_*` from the stored per-line nutrition.
pub async fn recompute_totals_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE recipes r
        SET total_calories = s.calories, total_protein = s.protein,
            total_fat = s.fat, total_carbs = s.carbs, updated_at = now()
        FROM (
            SELECT COALESCE(SUM(calories), 0) AS calories, COALESCE(SUM(protein), 0) AS protein,
                   COALESCE(SUM(fat), 0) AS fat, COALESCE(SUM(carbs), 0) AS carbs
            FROM recipe_ingredients WHERE recipe_id = $1
        ) s
        WHERE r.id = $1
        "#,
    )
    .bind(recipe_id)
    .execute(&mut **tx)
    .await
    .context("recompute recipe totals")?;
    Ok(())
}

/// No-op when the pair already exists.
pub async fn add_tag(db: &PgPool, recipe_id: Uuid, tag_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)
        ON CONFLICT (recipe_id, tag_id) DO NOTHING
        "#,
    )
    .bind(recipe_id)
    .bind(tag_id)
    .execute(db)
    .await
    .context("add recipe tag")?;
    Ok(())
}

pub async fn remove_tag(db: &PgPool, recipe_id: Uuid, link_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM recipe_tags WHERE id = $1 AND recipe_id = $2")
        .bind(link_id)
        .bind(recipe_id)
        .execute(db)
        .await
        .context("remove recipe tag")?;
    Ok(res.rows_affected() > 0)
}

/// Appends at the next free step number when `step_number` is `None`.
pub async fn add_step(
    db: &PgPool,
    recipe_id: Uuid,
    step_number: Option<i32>,
    instruction: &str,
    image_url: Option<&str>,
) -> anyhow::Result<Step> {
    let row = sqlx::query_as::<_, Step>(
        r#"
        INSERT INTO steps (recipe_id, step_number, instruction, image_url)
        VALUES (
            $1,
            COALESCE($2, (SELECT COALESCE(MAX(step_number), 0) + 1 FROM steps WHERE recipe_id = $1)),
            $3, $4
        )
        RETURNING id, recipe_id, step_number, instruction, image_url
        "#,
    )
    .bind(recipe_id)
    .bind(step_number)
    .bind(instruction)
    .bind(image_url)
    .fetch_one(db)
    .await
    .context("add step")?;
    Ok(row)
}

pub async fn remove_step(db: &PgPool, recipe_id: Uuid, step_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM steps WHERE id = $1 AND recipe_id = $2")
        .bind(step_id)
        .bind(recipe_id)
        .execute(db)
        .await
        .context("remove step")?;
    Ok(res.rows_affected() > 0)
}

pub async fn touch(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("UPDATE recipes SET updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("touch recipe")?;
    Ok(())
}
