use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::recipes::{repo::CARD_SELECT, repo_types::RecipeCard};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PopularTag {
    pub id: Uuid,
    pub name: String,
    pub usage_count: i64,
}

/// Tags used by at least one recipe, most used first, ties by name.
pub async fn popular_tags(db: &PgPool, take: i64) -> anyhow::Result<Vec<PopularTag>> {
    let rows = sqlx::query_as::<_, PopularTag>(
        r#"
        SELECT t.id, t.name, COUNT(*) AS usage_count
        FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id
        GROUP BY t.id, t.name
        ORDER BY usage_count DESC, t.name
        LIMIT $1
        "#,
    )
    .bind(take)
    .fetch_all(db)
    .await
    .context("popular tags")?;
    Ok(rows)
}

/// Recipes with at least one favorite, most favorited first.
pub async fn top_favorites(db: &PgPool, take: i64) -> anyhow::Result<Vec<RecipeCard>> {
    let rows = sqlx::query_as::<_, RecipeCard>(&format!(
        r#"
        SELECT * FROM ({CARD_SELECT}) c
        WHERE c.favorite_count > 0
        ORDER BY c.favorite_count DESC, c.created_at DESC
        LIMIT $1
        "#
    ))
    .bind(take)
    .fetch_all(db)
    .await
    .context("top favorite recipes")?;
    Ok(rows)
}

pub async fn recent_recipes(db: &PgPool, take: i64) -> anyhow::Result<Vec<RecipeCard>> {
    let rows = sqlx::query_as::<_, RecipeCard>(&format!(
        "{CARD_SELECT} ORDER BY r.created_at DESC LIMIT $1"
    ))
    .bind(take)
    .fetch_all(db)
    .await
    .context("recent recipes")?;
    Ok(rows)
}
