use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Tag, TagWithCount};
use crate::search::repo::escape_like;

pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY name")
        .fetch_all(db)
        .await
        .context("list tags")?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Tag>> {
    let row = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find tag")?;
    Ok(row)
}

/// Case-insensitive lookup, optionally ignoring one id (for renames).
pub async fn find_by_name(
    db: &PgPool,
    name: &str,
    except: Option<Uuid>,
) -> anyhow::Result<Option<Tag>> {
    let row = sqlx::query_as::<_, Tag>(
        r#"
        SELECT id, name FROM tags
        WHERE lower(name) = lower($1) AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(name.trim())
    .bind(except)
    .fetch_optional(db)
    .await
    .context("find tag by name")?;
    Ok(row)
}

pub async fn create(db: &PgPool, name: &str) -> anyhow::Result<Tag> {
    let row = sqlx::query_as::<_, Tag>("INSERT INTO tags (name) VALUES ($1) RETURNING id, name")
        .bind(name.trim())
        .fetch_one(db)
        .await
        .context("insert tag")?;
    Ok(row)
}

/// Inserts unless a tag with the same name (any case) exists; `None` on conflict.
pub async fn insert_if_absent(db: &PgPool, name: &str) -> anyhow::Result<Option<Tag>> {
    let row = sqlx::query_as::<_, Tag>(
        "INSERT INTO tags (name) VALUES ($1) ON CONFLICT DO NOTHING RETURNING id, name",
    )
    .bind(name.trim())
    .fetch_optional(db)
    .await
    .context("insert tag if absent")?;
    Ok(row)
}

pub async fn rename(db: &PgPool, id: Uuid, name: &str) -> anyhow::Result<Option<Tag>> {
    let row = sqlx::query_as::<_, Tag>(
        "UPDATE tags SET name = $2 WHERE id = $1 RETURNING id, name",
    )
    .bind(id)
    .bind(name.trim())
    .fetch_optional(db)
    .await
    .context("rename tag")?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete tag")?;
    Ok(res.rows_affected() > 0)
}

pub async fn usage_count(db: &PgPool, id: Uuid) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipe_tags WHERE tag_id = $1")
        .bind(id)
        .fetch_one(db)
        .await
        .context("tag usage")?;
    Ok(n)
}

/// Tags with usage counts, filtered by name substring, one page.
pub async fn list_with_counts(
    db: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<TagWithCount>, i64)> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(&s.to_lowercase())));

    let rows = sqlx::query_as::<_, TagWithCount>(
        r#"
        SELECT t.id, t.name, COUNT(rt.id) AS recipe_count
        FROM tags t
        LEFT JOIN recipe_tags rt ON rt.tag_id = t.id
        WHERE $1::text IS NULL OR lower(t.name) LIKE $1 ESCAPE '\'
        GROUP BY t.id, t.name
        ORDER BY t.name
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list tags with counts")?;

    let total: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM tags WHERE $1::text IS NULL OR lower(name) LIKE $1 ESCAPE '\'"#,
    )
    .bind(&pattern)
    .fetch_one(db)
    .await
    .context("count tags")?;

    Ok((rows, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test]
    #[ignore = "needs Postgres at DATABASE_URL"]
    async fn insert_if_absent_skips_existing_names(pool: PgPool) -> anyhow::Result<()> {
        let vegan = insert_if_absent(&pool, "Vegan").await?.unwrap();
        assert!(insert_if_absent(&pool, " vegan ").await?.is_none());
        assert_eq!(find_by_name(&pool, "VEGAN", None).await?.map(|t| t.id), Some(vegan.id));

        let (a, b) = tokio::join!(insert_if_absent(&pool, "Spicy"), insert_if_absent(&pool, "spicy"));
        assert_eq!(a?.is_some() as u8 + b?.is_some() as u8, 1);
        Ok(())
    }
}
