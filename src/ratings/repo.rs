use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Rating, RatingWithAuthor};

const COLUMNS: &str = "id, user_id, recipe_id, rating, comment, rated_at";

/// Insert or overwrite the user's rating of a recipe.
pub async fn upsert(
    db: &PgPool,
    user_id: Uuid,
    recipe_id: Uuid,
    rating: i32,
    comment: Option<&str>,
) -> anyhow::Result<Rating> {
    let row = sqlx::query_as::<_, Rating>(&format!(
        r#"
        INSERT INTO ratings (user_id, recipe_id, rating, comment, rated_at)
        VALUES ($1, $2, $3, $4, now())
        ON CONFLICT (user_id, recipe_id)
        DO UPDATE SET rating = EXCLUDED.rating, comment = EXCLUDED.comment, rated_at = now()
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(recipe_id)
    .bind(rating)
    .bind(comment)
    .fetch_one(db)
    .await
    .context("upsert rating")?;
    Ok(row)
}

pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    recipe_id: Uuid,
    rating: i32,
    comment: Option<&str>,
) -> anyhow::Result<Option<Rating>> {
    let row = sqlx::query_as::<_, Rating>(&format!(
        r#"
        UPDATE ratings SET rating = $3, comment = $4, rated_at = now()
        WHERE user_id = $1 AND recipe_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(recipe_id)
    .bind(rating)
    .bind(comment)
    .fetch_optional(db)
    .await
    .context("update rating")?;
    Ok(row)
}

/// Deletes only when the rating belongs to this user and recipe.
pub async fn delete_own(
    db: &PgPool,
    user_id: Uuid,
    rating_id: Uuid,
    recipe_id: Uuid,
) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM ratings WHERE id = $1 AND user_id = $2 AND recipe_id = $3")
        .bind(rating_id)
        .bind(user_id)
        .bind(recipe_id)
        .execute(db)
        .await
        .context("delete rating")?;
    Ok(res.rows_affected() > 0)
}

pub async fn find_for_user(
    db: &PgPool,
    user_id: Uuid,
    recipe_id: Uuid,
) -> anyhow::Result<Option<Rating>> {
    let row = sqlx::query_as::<_, Rating>(&format!(
        "SELECT {COLUMNS} FROM ratings WHERE user_id = $1 AND recipe_id = $2"
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_optional(db)
    .await
    .context("find user rating")?;
    Ok(row)
}

pub async fn list_for_recipe(db: &PgPool, recipe_id: Uuid) -> anyhow::Result<Vec<RatingWithAuthor>> {
    let rows = sqlx::query_as::<_, RatingWithAuthor>(
        r#"
        SELECT ra.id, ra.user_id, u.username, ra.rating, ra.comment, ra.rated_at
        FROM ratings ra
        LEFT JOIN users u ON u.id = ra.user_id
        WHERE ra.recipe_id = $1
        ORDER BY ra.rated_at DESC
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await
    .context("list recipe ratings")?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, ratings::services, state::AppState, testing};

    #[sqlx::test]
    #[ignore = "needs Postgres at DATABASE_URL"]
    async fn upsert_keeps_one_row_and_refreshes_time(pool: PgPool) -> anyhow::Result<()> {
        let cook = testing::user(&pool, "cook").await?;
        let recipe = testing::recipe(&pool, cook, "Goulash").await?;

        let first = upsert(&pool, cook, recipe, 3, Some("fine")).await?;
        sqlx::query("UPDATE ratings SET rated_at = now() - interval '1 day' WHERE id = $1")
            .bind(first.id)
            .execute(&pool)
            .await?;
        let stale = find_for_user(&pool, cook, recipe).await?.unwrap().rated_at;

        let second = upsert(&pool, cook, recipe, 5, Some("better")).await?;
        assert_eq!(second.id, first.id);
        assert_eq!(second.rating, 5);
        assert_eq!(second.comment.as_deref(), Some("better"));
        assert!(second.rated_at > stale);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings WHERE recipe_id = $1")
            .bind(recipe)
            .fetch_one(&pool)
            .await?;
        assert_eq!(rows, 1);
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "needs Postgres at DATABASE_URL"]
    async fn only_the_author_can_delete_a_rating(pool: PgPool) -> anyhow::Result<()> {
        let author = testing::user(&pool, "author").await?;
        let stranger = testing::user(&pool, "stranger").await?;
        let recipe = testing::recipe(&pool, author, "Kasha").await?;
        let rating = upsert(&pool, author, recipe, 4, None).await?;

        assert!(!delete_own(&pool, stranger, rating.id, recipe).await?);
        let state = AppState::with_pool(pool.clone());
        let err = services::delete_rating(&state, stranger, rating.id, recipe)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(find_for_user(&pool, author, recipe).await?.is_some());

        services::delete_rating(&state, author, rating.id, recipe).await?;
        assert!(find_for_user(&pool, author, recipe).await?.is_none());
        Ok(())
    }
}
