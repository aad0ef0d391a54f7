use axum::http::{header, HeaderMap};
use tracing::{info, warn};
use uuid::Uuid;

use super::repo::{self, ProfileUpdate, UserStats};
use crate::{
    activity::{self, ClientInfo},
    auth::{repo_types::User, services::is_valid_email},
    error::{is_unique_violation_any, AppError, AppResult},
    images::{self, services::UploadItem},
    state::AppState,
};

pub const THEME_COOKIE: &str = "fv_theme";
const THEME_COOKIE_MAX_AGE: i64 = 30 * 24 * 60 * 60;
const AVATAR_SIZE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    Auto,
}

impl Theme {
    pub fn parse(s: &str) -> Option<Theme> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "auto" => Some(Theme::Auto),
            _ => None,
        }
    }

    /// Unknown values fall back to `auto`.
    pub fn normalize(s: &str) -> Theme {
        Self::parse(s).unwrap_or(Theme::Auto)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        }
    }
}

pub fn theme_from_cookies(headers: &HeaderMap) -> Option<Theme> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == THEME_COOKIE)
        .and_then(|(_, v)| Theme::parse(v))
}

pub fn theme_cookie(theme: Theme) -> String {
    format!(
        "{THEME_COOKIE}={}; Path=/; Max-Age={THEME_COOKIE_MAX_AGE}; SameSite=Lax",
        theme.as_str()
    )
}

/// Cookie, then stored preference, then `auto`.
pub async fn resolve_theme(st: &AppState, headers: &HeaderMap, user: Option<Uuid>) -> Theme {
    if let Some(t) = theme_from_cookies(headers) {
        return t;
    }
    let Some(user_id) = user else {
        return Theme::Auto;
    };
    match repo::get_theme(&st.db, user_id).await {
        Ok(Some(stored)) => Theme::normalize(&stored),
        Ok(None) => Theme::Auto,
        Err(e) => {
            warn!(error = %e, %user_id, "theme lookup failed");
            Theme::Auto
        }
    }
}

pub async fn set_theme(st: &AppState, user: Option<Uuid>, raw: &str) -> AppResult<Theme> {
    let theme = Theme::normalize(raw);
    if let Some(user_id) = user {
        repo::upsert_theme(&st.db, user_id, theme.as_str()).await?;
        info!(%user_id, theme = theme.as_str(), "theme saved");
    }
    Ok(theme)
}

pub async fn load_user(st: &AppState, user_id: Uuid) -> AppResult<User> {
    User::find_by_id(&st.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn user_stats(st: &AppState, user_id: Uuid) -> AppResult<UserStats> {
    Ok(repo::stats(&st.db, user_id).await?)
}

fn trimmed(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn update_profile(
    st: &AppState,
    user_id: Uuid,
    req: &super::dto::UpdateProfileRequest,
    client: &ClientInfo,
) -> AppResult<User> {
    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::bad_request("Invalid email"));
    }
    let update = ProfileUpdate {
        name: trimmed(&req.name),
        email: &email,
        dietary_preferences: trimmed(&req.dietary_preferences),
        dietary_restrictions: trimmed(&req.dietary_restrictions),
    };
    let user = repo::update_profile(&st.db, user_id, &update)
        .await
        .map_err(|e| {
            if is_unique_violation_any(&e) {
                AppError::conflict("Email already in use")
            } else {
                AppError::Internal(e)
            }
        })?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    activity::record(&st.db, user_id, "UpdateProfile", client).await;
    info!(%user_id, "profile updated");
    Ok(user)
}

pub async fn update_avatar(st: &AppState, user_id: Uuid, file: UploadItem) -> AppResult<User> {
    let user = load_user(st, user_id).await?;
    let stored =
        images::services::store_resized(st, "avatars", file, AVATAR_SIZE, AVATAR_SIZE).await?;
    repo::set_avatar_url(&st.db, user_id, &stored.url).await?;
    images::services::delete_by_url(st, user.avatar_url.as_deref()).await;
    info!(%user_id, path = %stored.path, "avatar updated");
    load_user(st, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn theme_normalization() {
        assert_eq!(Theme::normalize("DARK"), Theme::Dark);
        assert_eq!(Theme::normalize(" light "), Theme::Light);
        assert_eq!(Theme::normalize("neon"), Theme::Auto);
        assert_eq!(Theme::normalize(""), Theme::Auto);
    }

    #[test]
    fn cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a=1; fv_theme=dark; b=2"));
        assert_eq!(theme_from_cookies(&headers), Some(Theme::Dark));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("fv_theme=purple"));
        assert_eq!(theme_from_cookies(&headers), None);
        assert_eq!(theme_from_cookies(&HeaderMap::new()), None);
    }

    #[test]
    fn cookie_attributes() {
        let c = theme_cookie(Theme::Light);
        assert!(c.starts_with("fv_theme=light;"));
        assert!(c.contains("Max-Age=2592000"));
        assert!(c.contains("SameSite=Lax"));
    }

    #[tokio::test]
    async fn resolve_prefers_cookie_and_defaults_to_auto() {
        let state = AppState::fake();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("fv_theme=light"));
        assert_eq!(resolve_theme(&state, &headers, None).await, Theme::Light);
        assert_eq!(resolve_theme(&state, &HeaderMap::new(), None).await, Theme::Auto);
    }

    #[tokio::test]
    async fn anonymous_set_theme_only_normalizes() {
        let state = AppState::fake();
        assert_eq!(set_theme(&state, None, "Dark").await.unwrap(), Theme::Dark);
        assert_eq!(set_theme(&state, None, "bogus").await.unwrap(), Theme::Auto);
    }
}
