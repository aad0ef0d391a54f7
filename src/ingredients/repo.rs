use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Ingredient, IngredientInput};
use crate::search::repo::escape_like;

const COLUMNS: &str = "id, name, default_unit, default_calories, default_protein, default_fat, default_carbs, image_url";

pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Ingredient>> {
    let rows = sqlx::query_as::<_, Ingredient>(&format!(
        "SELECT {COLUMNS} FROM ingredients ORDER BY name"
    ))
    .fetch_all(db)
    .await
    .context("list ingredients")?;
    Ok(rows)
}

/// Name-filtered page ordered by name, with the filtered total.
pub async fn list_page(
    db: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<Ingredient>, i64)> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(&s.to_lowercase())));
    let rows = sqlx::query_as::<_, Ingredient>(&format!(
        r#"
        SELECT {COLUMNS} FROM ingredients
        WHERE $1::text IS NULL OR lower(name) LIKE $1 ESCAPE '\'
        ORDER BY name
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list ingredients page")?;
    let total: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM ingredients WHERE $1::text IS NULL OR lower(name) LIKE $1 ESCAPE '\'"#,
    )
    .bind(&pattern)
    .fetch_one(db)
    .await
    .context("count ingredients")?;
    Ok((rows, total))
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Ingredient>> {
    let row = sqlx::query_as::<_, Ingredient>(&format!(
        "SELECT {COLUMNS} FROM ingredients WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find ingredient")?;
    Ok(row)
}

/// Case-insensitive lookup, optionally ignoring one id (for renames).
pub async fn find_by_name(
    db: &PgPool,
    name: &str,
    except: Option<Uuid>,
) -> anyhow::Result<Option<Ingredient>> {
    let row = sqlx::query_as::<_, Ingredient>(&format!(
        r#"
        SELECT {COLUMNS} FROM ingredients
        WHERE lower(name) = lower($1) AND ($2::uuid IS NULL OR id <> $2)
        "#
    ))
    .bind(name.trim())
    .bind(except)
    .fetch_optional(db)
    .await
    .context("find ingredient by name")?;
    Ok(row)
}

pub async fn create(db: &PgPool, input: &IngredientInput) -> anyhow::Result<Ingredient> {
    let row = sqlx::query_as::<_, Ingredient>(&format!(
        r#"
        INSERT INTO ingredients
            (name, default_unit, default_calories, default_protein, default_fat, default_carbs, image_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(input.name.trim())
    .bind(&input.default_unit)
    .bind(input.default_calories)
    .bind(input.default_protein)
    .bind(input.default_fat)
    .bind(input.default_carbs)
    .bind(&input.image_url)
    .fetch_one(db)
    .await
    .context("insert ingredient")?;
    Ok(row)
}

/// Existing ingredient with this name (any case), or a new bare one.
/// Concurrent callers with the same name converge on one row.
pub async fn find_or_create(db: &PgPool, name: &str) -> anyhow::Result<Ingredient> {
    if let Some(found) = find_by_name(db, name, None).await? {
        return Ok(found);
    }
    let inserted = sqlx::query_as::<_, Ingredient>(&format!(
        "INSERT INTO ingredients (name) VALUES ($1) ON CONFLICT DO NOTHING RETURNING {COLUMNS}"
    ))
    .bind(name.trim())
    .fetch_optional(db)
    .await
    .context("insert ingredient if absent")?;
    match inserted {
        Some(row) => Ok(row),
        None => find_by_name(db, name, None)
            .await?
            .context("ingredient missing after insert conflict"),
    }
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    input: &IngredientInput,
) -> anyhow::Result<Option<Ingredient>> {
    let row = sqlx::query_as::<_, Ingredient>(&format!(
        r#"
        UPDATE ingredients
        SET name = $2, default_unit = $3, default_calories = $4, default_protein = $5,
            default_fat = $6, default_carbs = $7, image_url = $8
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(input.name.trim())
    .bind(&input.default_unit)
    .bind(input.default_calories)
    .bind(input.default_protein)
    .bind(input.default_fat)
    .bind(input.default_carbs)
    .bind(&input.image_url)
    .fetch_optional(db)
    .await
    .context("update ingredient")?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM ingredients WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete ingredient")?;
    Ok(res.rows_affected() > 0)
}

/// (recipe lines, fridge items) referencing the ingredient.
pub async fn usage(db: &PgPool, id: Uuid) -> anyhow::Result<(i64, i64)> {
    let row: (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM recipe_ingredients WHERE ingredient_id = $1),
            (SELECT COUNT(*) FROM fridge_ingredients WHERE ingredient_id = $1)
        "#,
    )
    .bind(id)
    .fetch_one(db)
    .await
    .context("ingredient usage")?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test]
    #[ignore = "needs Postgres at DATABASE_URL"]
    async fn find_or_create_ignores_case(pool: PgPool) -> anyhow::Result<()> {
        let first = find_or_create(&pool, "Tomato").await?;
        let again = find_or_create(&pool, "  tOMATO ").await?;
        assert_eq!(again.id, first.id);
        assert_eq!(again.name, "Tomato");

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingredients")
            .fetch_one(&pool)
            .await?;
        assert_eq!(rows, 1);
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "needs Postgres at DATABASE_URL"]
    async fn concurrent_find_or_create_converges(pool: PgPool) -> anyhow::Result<()> {
        let (a, b) = tokio::join!(find_or_create(&pool, "Basil"), find_or_create(&pool, "basil"));
        assert_eq!(a?.id, b?.id);
        assert!(find_by_name(&pool, "BASIL", None).await?.is_some());
        Ok(())
    }
}
