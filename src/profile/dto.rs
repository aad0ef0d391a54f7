use serde::{Deserialize, Serialize};

use super::{repo::UserStats, services::Theme};
use crate::auth::repo_types::User;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub stats: UserStats,
    pub theme: Theme,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: String,
    pub dietary_preferences: Option<String>,
    pub dietary_restrictions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetThemeRequest {
    pub theme: String,
}

#[derive(Debug, Serialize)]
pub struct ThemeResponse {
    pub theme: Theme,
}
