use std::time::Duration;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};
use tracing::{error, instrument};

use super::{
    health::{self, SystemHealth},
    repo::{self, Totals},
};
use crate::{
    activity::repo::{list_recent, ActivityRow},
    auth::StaffUser,
    cache::{
        user_growth_key, DASHBOARD_KEY, POPULAR_RECIPES_KEY, RECENT_ACTIVITIES_KEY,
        SYSTEM_HEALTH_KEY,
    },
    recipes::repo_types::RecipeCard,
    state::AppState,
};

const LONG_TTL: Duration = Duration::from_secs(5 * 60);
const SHORT_TTL: Duration = Duration::from_secs(60);
const POPULAR_TAKE: i64 = 10;
const ACTIVITY_TAKE: i64 = 10;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/dashboard/user-growth", get(user_growth))
        .route("/dashboard/popular-recipes", get(popular_recipes))
        .route("/dashboard/recent-activities", get(recent_activities))
        .route("/dashboard/system-health", get(system_health))
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityView {
    pub user_name: String,
    pub action: String,
    pub details: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl From<ActivityRow> for ActivityView {
    fn from(a: ActivityRow) -> Self {
        let details = match (a.ip_address.as_deref(), a.user_agent.as_deref()) {
            (None, None) => "N/A".to_string(),
            (ip, ua) => format!("{} - {}", ip.unwrap_or("N/A"), ua.unwrap_or("N/A")),
        };
        Self {
            user_name: a.username.unwrap_or_else(|| "Unknown".into()),
            action: a.action,
            details,
            timestamp: a.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    #[serde(flatten)]
    pub totals: Totals,
    pub popular_recipes: Vec<RecipeCard>,
    pub recent_activities: Vec<ActivityView>,
    pub system_health: SystemHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DashboardData {
    fn failed(message: &str) -> Self {
        Self {
            totals: Totals::default(),
            popular_recipes: Vec::new(),
            recent_activities: Vec::new(),
            system_health: SystemHealth::zero(),
            error: Some(message.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GrowthPoint {
    pub date: String,
    pub count: i64,
}

fn day_label(d: Date) -> String {
    format!("{:02}/{:02}", d.day(), u8::from(d.month()))
}

/// One point per day from `today - (days - 1)` through `today`, zero-filled.
pub fn growth_series(counts: &[(Date, i64)], today: Date, days: i64) -> Vec<GrowthPoint> {
    (0..days)
        .rev()
        .map(|back| {
            let day = today - time::Duration::days(back);
            let count = counts
                .iter()
                .find(|(d, _)| *d == day)
                .map_or(0, |(_, n)| *n);
            GrowthPoint {
                date: day_label(day),
                count,
            }
        })
        .collect()
}

async fn cached_popular(st: &AppState) -> anyhow::Result<Vec<RecipeCard>> {
    st.cache
        .get_or_try_insert_with(POPULAR_RECIPES_KEY, LONG_TTL, || {
            repo::popular_recipes(&st.db, POPULAR_TAKE)
        })
        .await
}

async fn cached_activities(st: &AppState) -> anyhow::Result<Vec<ActivityView>> {
    st.cache
        .get_or_try_insert_with(RECENT_ACTIVITIES_KEY, SHORT_TTL, || async {
            let rows = list_recent(&st.db, ACTIVITY_TAKE).await?;
            anyhow::Ok(rows.into_iter().map(ActivityView::from).collect())
        })
        .await
}

async fn cached_health(st: &AppState) -> SystemHealth {
    let res: Result<SystemHealth, std::convert::Infallible> = st
        .cache
        .get_or_try_insert_with(SYSTEM_HEALTH_KEY, SHORT_TTL, || async {
            let mut h = health::sample().await;
            h.cpu_usage = health::round2(h.cpu_usage);
            h.memory_usage = health::round2(h.memory_usage);
            h.disk_usage = health::round2(h.disk_usage);
            Ok(h)
        })
        .await;
    match res {
        Ok(h) => h,
        Err(never) => match never {},
    }
}

async fn load_dashboard(st: &AppState) -> anyhow::Result<DashboardData> {
    st.cache
        .get_or_try_insert_with(DASHBOARD_KEY, LONG_TTL, || async {
            let day_start = OffsetDateTime::now_utc().replace_time(Time::MIDNIGHT);
            let totals = repo::totals(&st.db, day_start).await?;
            anyhow::Ok(DashboardData {
                totals,
                popular_recipes: cached_popular(st).await?,
                recent_activities: cached_activities(st).await?,
                system_health: cached_health(st).await,
                error: None,
            })
        })
        .await
}

#[instrument(skip(state))]
pub async fn dashboard(State(state): State<AppState>, StaffUser(_): StaffUser) -> Json<DashboardData> {
    match load_dashboard(&state).await {
        Ok(data) => Json(data),
        Err(e) => {
            error!(error = ?e, "dashboard load failed");
            Json(DashboardData::failed("Error loading dashboard data"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GrowthQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    30
}

#[instrument(skip(state))]
pub async fn user_growth(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Query(q): Query<GrowthQuery>,
) -> Json<Vec<GrowthPoint>> {
    let days = q.days.clamp(1, 365);
    let res = state
        .cache
        .get_or_try_insert_with(&user_growth_key(days), LONG_TTL, || async {
            let today = OffsetDateTime::now_utc().date();
            let since = (today - time::Duration::days(days - 1)).midnight().assume_utc();
            let counts = repo::signups_per_day(&state.db, since).await?;
            anyhow::Ok(growth_series(&counts, today, days))
        })
        .await;
    match res {
        Ok(points) => Json(points),
        Err(e) => {
            error!(error = ?e, days, "user growth load failed");
            Json(Vec::new())
        }
    }
}

#[instrument(skip(state))]
pub async fn popular_recipes(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
) -> crate::error::AppResult<Json<Vec<RecipeCard>>> {
    Ok(Json(cached_popular(&state).await?))
}

#[instrument(skip(state))]
pub async fn recent_activities(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
) -> crate::error::AppResult<Json<Vec<ActivityView>>> {
    Ok(Json(cached_activities(&state).await?))
}

#[instrument(skip(state))]
pub async fn system_health(State(state): State<AppState>, StaffUser(_): StaffUser) -> Json<SystemHealth> {
    Json(cached_health(&state).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn growth_is_zero_filled_and_labelled() {
        let today = date!(2024 - 03 - 02);
        let counts = vec![(date!(2024 - 02 - 29), 3), (date!(2024 - 03 - 02), 1)];
        let series = growth_series(&counts, today, 4);
        assert_eq!(
            series,
            vec![
                GrowthPoint { date: "28/02".into(), count: 0 },
                GrowthPoint { date: "29/02".into(), count: 3 },
                GrowthPoint { date: "01/03".into(), count: 0 },
                GrowthPoint { date: "02/03".into(), count: 1 },
            ]
        );
    }

    fn activity(ip: Option<&str>, ua: Option<&str>) -> ActivityRow {
        ActivityRow {
            username: Some("chef".into()),
            action: "Login".into(),
            ip_address: ip.map(Into::into),
            user_agent: ua.map(Into::into),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn activity_details() {
        assert_eq!(ActivityView::from(activity(None, None)).details, "N/A");
        assert_eq!(
            ActivityView::from(activity(Some("10.0.0.1"), Some("curl/8"))).details,
            "10.0.0.1 - curl/8"
        );
        assert_eq!(ActivityView::from(activity(Some("10.0.0.1"), None)).details, "10.0.0.1 - N/A");
    }

    #[test]
    fn growth_window_defaults_to_a_month() {
        let q: GrowthQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.days, 30);
        assert_eq!(growth_series(&[], date!(2024 - 03 - 02), q.days).len(), 30);
    }

    #[test]
    fn failed_dashboard_is_zeroed() {
        let d = DashboardData::failed("Error loading dashboard data");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["total_users"], 0);
        assert_eq!(json["error"], "Error loading dashboard data");
        assert!(json["popular_recipes"].as_array().unwrap().is_empty());
    }
}
