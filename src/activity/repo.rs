use anyhow::Context;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use super::ClientInfo;

#[derive(Debug, Clone, FromRow)]
pub struct ActivityRow {
    pub username: Option<String>,
    pub action: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: OffsetDateTime,
}

fn clip(s: Option<&str>, max: usize) -> Option<String> {
    s.map(|v| v.chars().take(max).collect())
}

/// Append an activity row. Failures are logged, never propagated.
pub async fn record(db: &PgPool, user_id: Uuid, action: &str, client: &ClientInfo) {
    let res = sqlx::query(
        r#"
        INSERT INTO user_activities (user_id, action, ip_address, user_agent)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(user_id)
    .bind(clip(Some(action), 100))
    .bind(clip(client.ip.as_deref(), 50))
    .bind(clip(client.user_agent.as_deref(), 500))
    .execute(db)
    .await;
    if let Err(e) = res {
        warn!(error = %e, %user_id, action, "failed to record activity");
    }
}

pub async fn list_recent(db: &PgPool, limit: i64) -> anyhow::Result<Vec<ActivityRow>> {
    let rows = sqlx::query_as::<_, ActivityRow>(
        r#"
        SELECT u.username, a.action, a.ip_address, a.user_agent, a.created_at
        FROM user_activities a
        LEFT JOIN users u ON u.id = a.user_id
        ORDER BY a.created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await
    .context("list recent activities")?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::clip;

    #[test]
    fn clip_truncates_on_char_boundary() {
        assert_eq!(clip(Some("héllo"), 2).as_deref(), Some("hé"));
        assert_eq!(clip(None, 5), None);
    }
}
