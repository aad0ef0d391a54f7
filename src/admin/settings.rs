use axum::{extract::State, routing::get, Json, Router};
use tracing::{info, instrument};

use super::dto::Message;
use crate::{auth::AdminUser, config::SiteSettings, error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).put(update_settings))
}

#[instrument(skip(state))]
pub async fn get_settings(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Json<SiteSettings> {
    Json(state.config.site.clone())
}

/// Settings come from the environment; submitted values are only logged.
#[instrument(skip(payload))]
pub async fn update_settings(
    AdminUser(admin_id): AdminUser,
    Json(payload): Json<SiteSettings>,
) -> AppResult<Json<Message>> {
    info!(
        %admin_id,
        site_name = %payload.site_name,
        maintenance_mode = payload.maintenance_mode,
        max_file_size = payload.max_file_size,
        "site settings submitted"
    );
    Ok(Json(Message::new("Settings saved")))
}

#[cfg(test)]
mod tests {
    use crate::{
        app::build_app,
        auth::{repo_types::Role, services::JwtKeys},
        state::AppState,
    };
    use axum::{
        body::{to_bytes, Body},
        extract::FromRef,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn admin_reads_configured_settings() {
        let state = AppState::fake();
        let t = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4(), Role::Admin).unwrap();
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .uri("/admin/settings")
                    .header("authorization", format!("Bearer {t}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["site_name"], "FoodVault");
    }
}
