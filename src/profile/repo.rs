use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::{repo::USER_COLUMNS, repo_types::User};

#[derive(Debug, Clone, Copy, Default, Serialize, FromRow)]
pub struct UserStats {
    pub recipes: i64,
    pub favorites: i64,
    pub fridges: i64,
}

pub struct ProfileUpdate<'a> {
    pub name: Option<&'a str>,
    pub email: &'a str,
    pub dietary_preferences: Option<&'a str>,
    pub dietary_restrictions: Option<&'a str>,
}

pub async fn update_profile(
    db: &PgPool,
    user_id: Uuid,
    p: &ProfileUpdate<'_>,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET name = $2, email = $3, dietary_preferences = $4, dietary_restrictions = $5
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(p.name)
    .bind(p.email)
    .bind(p.dietary_preferences)
    .bind(p.dietary_restrictions)
    .fetch_optional(db)
    .await
    .context("update profile")?;
    Ok(user)
}

pub async fn set_avatar_url(db: &PgPool, user_id: Uuid, url: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET avatar_url = $2 WHERE id = $1")
        .bind(user_id)
        .bind(url)
        .execute(db)
        .await
        .context("set avatar url")?;
    Ok(())
}

pub async fn stats(db: &PgPool, user_id: Uuid) -> anyhow::Result<UserStats> {
    let row = sqlx::query_as::<_, UserStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM recipes WHERE user_id = $1) AS recipes,
            (SELECT COUNT(*) FROM favorites WHERE user_id = $1) AS favorites,
            (SELECT COUNT(*) FROM fridges WHERE user_id = $1) AS fridges
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("user stats")?;
    Ok(row)
}

pub async fn get_theme(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<String>> {
    let theme = sqlx::query_scalar("SELECT theme FROM user_preferences WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("get theme")?;
    Ok(theme)
}

pub async fn upsert_theme(db: &PgPool, user_id: Uuid, theme: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_preferences (user_id, theme, updated_at) VALUES ($1, $2, now())
        ON CONFLICT (user_id) DO UPDATE SET theme = EXCLUDED.theme, updated_at = now()
        "#,
    )
    .bind(user_id)
    .bind(theme)
    .execute(db)
    .await
    .context("upsert theme")?;
    Ok(())
}
