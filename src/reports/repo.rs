use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{ReportRow, ReportStatus, ReportTarget};

const REPORT_SELECT: &str = r#"
    SELECT rp.id, rp.reporter_id, ru.username AS reporter_name, rp.target_type, rp.target_id,
           rp.reason, rp.status, rp.created_at, rp.resolved_at, rp.resolved_by,
           su.username AS resolver_name
    FROM reports rp
    LEFT JOIN users ru ON ru.id = rp.reporter_id
    LEFT JOIN users su ON su.id = rp.resolved_by
"#;

pub async fn insert(
    db: &PgPool,
    reporter_id: Uuid,
    target: ReportTarget,
    target_id: Uuid,
    reason: Option<&str>,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO reports (reporter_id, target_type, target_id, reason, status, created_at)
        VALUES ($1, $2, $3, $4, 'Pending', now())
        RETURNING id
        "#,
    )
    .bind(reporter_id)
    .bind(target.as_str())
    .bind(target_id)
    .bind(reason)
    .fetch_one(db)
    .await
    .context("insert report")?;
    Ok(id)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ReportRow>> {
    let row = sqlx::query_as::<_, ReportRow>(&format!("{REPORT_SELECT} WHERE rp.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find report")?;
    Ok(row)
}

/// Newest first; `status = None` lists every report.
pub async fn list(
    db: &PgPool,
    status: Option<ReportStatus>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<ReportRow>, i64)> {
    let status = status.map(ReportStatus::as_str);
    let rows = sqlx::query_as::<_, ReportRow>(&format!(
        r#"
        {REPORT_SELECT}
        WHERE $1::text IS NULL OR rp.status = $1
        ORDER BY rp.created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list reports")?;
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE $1::text IS NULL OR status = $1")
            .bind(status)
            .fetch_one(db)
            .await
            .context("count reports")?;
    Ok((rows, total))
}

pub async fn pending_count(db: &PgPool) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE status = 'Pending'")
        .fetch_one(db)
        .await
        .context("count pending reports")?;
    Ok(n)
}

pub async fn close(
    db: &PgPool,
    id: Uuid,
    status: ReportStatus,
    resolver: Uuid,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "UPDATE reports SET status = $2, resolved_at = now(), resolved_by = $3 WHERE id = $1",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(resolver)
    .execute(db)
    .await
    .context("close report")?;
    Ok(res.rows_affected() > 0)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM reports WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete report")?;
    Ok(res.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[sqlx::test]
    #[ignore = "needs Postgres at DATABASE_URL"]
    async fn closing_records_resolver_and_time(pool: PgPool) -> anyhow::Result<()> {
        let reporter = testing::user(&pool, "reporter").await?;
        let moderator = testing::user(&pool, "moderator").await?;
        let recipe = testing::recipe(&pool, reporter, "Suspicious stew").await?;
        let id = insert(&pool, reporter, ReportTarget::Recipe, recipe, Some("spam")).await?;
        assert_eq!(pending_count(&pool).await?, 1);

        assert!(close(&pool, id, ReportStatus::Resolved, moderator).await?);
        let row = find_by_id(&pool, id).await?.unwrap();
        assert_eq!(row.status, "Resolved");
        assert_eq!(row.resolved_by, Some(moderator));
        assert_eq!(row.resolver_name.as_deref(), Some("moderator"));
        assert!(row.resolved_at.is_some());
        assert_eq!(pending_count(&pool).await?, 0);

        assert!(!close(&pool, Uuid::new_v4(), ReportStatus::Dismissed, moderator).await?);
        Ok(())
    }
}
