use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    auth::{repo::USER_COLUMNS, repo_types::{Role, User}},
    recipes::{repo::CARD_SELECT, repo_types::RecipeCard},
    search::repo::escape_like,
};

#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct Totals {
    pub total_users: i64,
    pub total_recipes: i64,
    pub total_comments: i64,
    pub average_rating: f64,
    pub new_users_today: i64,
    pub new_recipes_today: i64,
    pub pending_reports: i64,
}

pub async fn totals(db: &PgPool, day_start: OffsetDateTime) -> anyhow::Result<Totals> {
    let row = sqlx::query_as::<_, Totals>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM recipes) AS total_recipes,
            (SELECT COUNT(*) FROM ratings WHERE comment IS NOT NULL AND btrim(comment) <> '') AS total_comments,
            COALESCE((SELECT AVG(rating)::float8 FROM ratings WHERE rating > 0), 0) AS average_rating,
            (SELECT COUNT(*) FROM users WHERE created_at >= $1) AS new_users_today,
            (SELECT COUNT(*) FROM recipes WHERE created_at >= $1) AS new_recipes_today,
            (SELECT COUNT(*) FROM reports WHERE status = 'Pending') AS pending_reports
        "#,
    )
    .bind(day_start)
    .fetch_one(db)
    .await
    .context("dashboard totals")?;
    Ok(row)
}

/// Registrations per UTC day since `since`.
pub async fn signups_per_day(db: &PgPool, since: OffsetDateTime) -> anyhow::Result<Vec<(Date, i64)>> {
    let rows = sqlx::query_as::<_, (Date, i64)>(
        r#"
        SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*)
        FROM users WHERE created_at >= $1
        GROUP BY 1
        "#,
    )
    .bind(since)
    .fetch_all(db)
    .await
    .context("signups per day")?;
    Ok(rows)
}

/// Most favorited, ties broken by average rating.
pub async fn popular_recipes(db: &PgPool, take: i64) -> anyhow::Result<Vec<RecipeCard>> {
    let rows = sqlx::query_as::<_, RecipeCard>(&format!(
        r#"
        SELECT * FROM ({CARD_SELECT}) c
        ORDER BY c.favorite_count DESC, c.avg_rating DESC
        LIMIT $1
        "#
    ))
    .bind(take)
    .fetch_all(db)
    .await
    .context("popular recipes")?;
    Ok(rows)
}

fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(&s.to_lowercase())))
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminUserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub email_confirmed: bool,
    pub lockout_enabled: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub lockout_end: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub recipe_count: i64,
    pub favorite_count: i64,
    pub rating_count: i64,
}

const ADMIN_USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.email, u.name, u.role, u.email_confirmed, u.lockout_enabled,
           u.lockout_end, u.created_at,
           (SELECT COUNT(*) FROM recipes r WHERE r.user_id = u.id) AS recipe_count,
           (SELECT COUNT(*) FROM favorites f WHERE f.user_id = u.id) AS favorite_count,
           (SELECT COUNT(*) FROM ratings ra WHERE ra.user_id = u.id) AS rating_count
    FROM users u
"#;

pub async fn list_users(
    db: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<AdminUserRow>, i64)> {
    let pattern = like_pattern(search);
    let rows = sqlx::query_as::<_, AdminUserRow>(&format!(
        r#"
        {ADMIN_USER_SELECT}
        WHERE $1::text IS NULL OR lower(u.username) LIKE $1 ESCAPE '\' OR lower(u.email) LIKE $1 ESCAPE '\'
        ORDER BY u.created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("admin list users")?;
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM users u
        WHERE $1::text IS NULL OR lower(u.username) LIKE $1 ESCAPE '\' OR lower(u.email) LIKE $1 ESCAPE '\'
        "#,
    )
    .bind(&pattern)
    .fetch_one(db)
    .await
    .context("admin count users")?;
    Ok((rows, total))
}

pub async fn user_details(db: &PgPool, id: Uuid) -> anyhow::Result<Option<AdminUserRow>> {
    let row = sqlx::query_as::<_, AdminUserRow>(&format!("{ADMIN_USER_SELECT} WHERE u.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("admin user details")?;
    Ok(row)
}

pub struct UserEdit<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub phone_number: Option<&'a str>,
    pub email_confirmed: bool,
    pub lockout_enabled: bool,
    pub lockout_end: Option<OffsetDateTime>,
    pub role: Role,
}

pub async fn edit_user(db: &PgPool, id: Uuid, e: &UserEdit<'_>) -> anyhow::Result<Option<User>> {
    let row = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET username = $2, email = $3, phone_number = $4, email_confirmed = $5,
            lockout_enabled = $6, lockout_end = $7, role = $8
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(e.username)
    .bind(e.email)
    .bind(e.phone_number)
    .bind(e.email_confirmed)
    .bind(e.lockout_enabled)
    .bind(e.lockout_end)
    .bind(e.role.as_str())
    .fetch_optional(db)
    .await
    .context("admin edit user")?;
    Ok(row)
}

pub async fn set_lockout(
    db: &PgPool,
    id: Uuid,
    end: Option<OffsetDateTime>,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "UPDATE users SET lockout_enabled = TRUE, lockout_end = $2 WHERE id = $1",
    )
    .bind(id)
    .bind(end)
    .execute(db)
    .await
    .context("set lockout")?;
    Ok(res.rows_affected() > 0)
}

/// Removes the user and everything they own in one transaction.
/// Returns `false` when no such user exists.
pub async fn delete_user_cascade(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let mut tx = db.begin().await.context("begin tx")?;

    // Rows in other users' content that point at this user's recipes cascade
    // from `recipes`; the rest is removed explicitly.
    let statements = [
        "DELETE FROM favorites WHERE user_id = $1",
        "DELETE FROM ratings WHERE user_id = $1",
        "DELETE FROM recipes WHERE user_id = $1",
        "DELETE FROM fridges WHERE user_id = $1",
        "DELETE FROM user_preferences WHERE user_id = $1",
        "DELETE FROM user_activities WHERE user_id = $1",
        "DELETE FROM reports WHERE reporter_id = $1",
        "UPDATE reports SET resolved_by = NULL WHERE resolved_by = $1",
    ];
    for sql in statements {
        sqlx::query(sql)
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("user cascade: {sql}"))?;
    }

    let res = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("delete user")?;
    if res.rows_affected() == 0 {
        tx.rollback().await.context("rollback")?;
        return Ok(false);
    }
    tx.commit().await.context("commit tx")?;
    Ok(true)
}

pub async fn list_recipes(
    db: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<RecipeCard>, i64)> {
    let pattern = like_pattern(search);
    let rows = sqlx::query_as::<_, RecipeCard>(&format!(
        r#"
        {CARD_SELECT}
        WHERE $1::text IS NULL OR lower(r.title) LIKE $1 ESCAPE '\'
              OR lower(COALESCE(r.description, '')) LIKE $1 ESCAPE '\'
              OR lower(COALESCE(u.username, '')) LIKE $1 ESCAPE '\'
        ORDER BY r.created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("admin list recipes")?;
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM recipes r LEFT JOIN users u ON u.id = r.user_id
        WHERE $1::text IS NULL OR lower(r.title) LIKE $1 ESCAPE '\'
              OR lower(COALESCE(r.description, '')) LIKE $1 ESCAPE '\'
              OR lower(COALESCE(u.username, '')) LIKE $1 ESCAPE '\'
        "#,
    )
    .bind(&pattern)
    .fetch_one(db)
    .await
    .context("admin count recipes")?;
    Ok((rows, total))
}

/// At least `min_ratings` ratings averaging `min_avg`, or `min_favorites` favorites;
/// ranked by `avg * 0.6 + favorites * 0.4`.
pub async fn featured_recipes(
    db: &PgPool,
    min_ratings: i64,
    min_avg: f64,
    min_favorites: i64,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<RecipeCard>, i64)> {
    let filter = r#"
        (c.rating_count >= $1 AND c.avg_rating >= $2) OR c.favorite_count >= $3
    "#;
    let rows = sqlx::query_as::<_, RecipeCard>(&format!(
        r#"
        SELECT * FROM ({CARD_SELECT}) c
        WHERE {filter}
        ORDER BY c.avg_rating * 0.6 + c.favorite_count * 0.4 DESC
        LIMIT $4 OFFSET $5
        "#
    ))
    .bind(min_ratings)
    .bind(min_avg)
    .bind(min_favorites)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("featured recipes")?;
    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM ({CARD_SELECT}) c WHERE {filter}"
    ))
    .bind(min_ratings)
    .bind(min_avg)
    .bind(min_favorites)
    .fetch_one(db)
    .await
    .context("count featured recipes")?;
    Ok((rows, total))
}

/// Created on or after `since`, or never edited.
pub async fn pending_recipes(
    db: &PgPool,
    since: OffsetDateTime,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<RecipeCard>, i64)> {
    let rows = sqlx::query_as::<_, RecipeCard>(&format!(
        r#"
        {CARD_SELECT}
        WHERE r.created_at >= $1 OR r.updated_at IS NULL
        ORDER BY r.created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(since)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("pending recipes")?;
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM recipes r WHERE r.created_at >= $1 OR r.updated_at IS NULL",
    )
    .bind(since)
    .fetch_one(db)
    .await
    .context("count pending recipes")?;
    Ok((rows, total))
}

/// Title of a recipe, username of a user, or the recipe a rating belongs to.
pub async fn recipe_title(db: &PgPool, id: Uuid) -> anyhow::Result<Option<String>> {
    let t = sqlx::query_scalar("SELECT title FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("recipe title")?;
    Ok(t)
}

pub async fn username(db: &PgPool, id: Uuid) -> anyhow::Result<Option<String>> {
    let t = sqlx::query_scalar("SELECT username FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("username")?;
    Ok(t)
}

/// (recipe id, recipe title) for a rating.
pub async fn rating_recipe(db: &PgPool, rating_id: Uuid) -> anyhow::Result<Option<(Uuid, String)>> {
    let row = sqlx::query_as::<_, (Uuid, String)>(
        r#"
        SELECT r.id, r.title FROM ratings ra JOIN recipes r ON r.id = ra.recipe_id
        WHERE ra.id = $1
        "#,
    )
    .bind(rating_id)
    .fetch_optional(db)
    .await
    .context("rating recipe")?;
    Ok(row)
}
