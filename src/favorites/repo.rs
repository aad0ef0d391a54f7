use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::recipes::{repo::CARD_SELECT, repo_types::RecipeCard};

pub async fn exists(db: &PgPool, user_id: Uuid, recipe_id: Uuid) -> anyhow::Result<bool> {
    let found: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM favorites WHERE user_id = $1 AND recipe_id = $2)",
    )
    .bind(user_id)
    .bind(recipe_id)
    .fetch_one(db)
    .await
    .context("favorite exists")?;
    Ok(found)
}

/// `false` when the pair was already present.
pub async fn insert(db: &PgPool, user_id: Uuid, recipe_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        INSERT INTO favorites (user_id, recipe_id, favorited_at)
        VALUES ($1, $2, now())
        ON CONFLICT (user_id, recipe_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(db)
    .await
    .context("insert favorite")?;
    Ok(res.rows_affected() > 0)
}

pub async fn delete(db: &PgPool, user_id: Uuid, recipe_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(db)
        .await
        .context("delete favorite")?;
    Ok(res.rows_affected() > 0)
}

/// Recipes the user favorited, most recent favorite first.
pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<RecipeCard>> {
    let rows = sqlx::query_as::<_, RecipeCard>(&format!(
        r#"
        {CARD_SELECT}
        JOIN favorites fav ON fav.recipe_id = r.id AND fav.user_id = $1
        ORDER BY fav.favorited_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list user favorites")?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, favorites::services, state::AppState, testing};

    #[sqlx::test]
    #[ignore = "needs Postgres at DATABASE_URL"]
    async fn second_favorite_of_same_recipe_conflicts(pool: PgPool) -> anyhow::Result<()> {
        let cook = testing::user(&pool, "cook").await?;
        let recipe = testing::recipe(&pool, cook, "Borscht").await?;

        assert!(insert(&pool, cook, recipe).await?);
        assert!(!insert(&pool, cook, recipe).await?);

        let state = AppState::with_pool(pool.clone());
        let err = services::add_favorite(&state, cook, recipe).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(list_for_user(&pool, cook).await?.len(), 1);
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "needs Postgres at DATABASE_URL"]
    async fn toggle_flips_state(pool: PgPool) -> anyhow::Result<()> {
        let cook = testing::user(&pool, "cook").await?;
        let recipe = testing::recipe(&pool, cook, "Pierogi").await?;
        let state = AppState::with_pool(pool.clone());

        assert!(services::toggle_favorite(&state, cook, recipe).await?);
        assert!(exists(&pool, cook, recipe).await?);
        assert!(!services::toggle_favorite(&state, cook, recipe).await?);
        assert!(!exists(&pool, cook, recipe).await?);
        Ok(())
    }
}
