//! Staff back office: dashboard, moderation and catalog maintenance under `/admin`.

use crate::state::AppState;
use axum::Router;

pub mod dashboard;
pub mod dto;
pub mod health;
pub mod ingredients;
pub mod recipes;
pub mod repo;
pub mod reports;
pub mod settings;
pub mod tags;
pub mod users;

pub fn router() -> Router<AppState> {
    let admin = Router::new()
        .merge(dashboard::routes())
        .merge(users::routes())
        .merge(recipes::routes())
        .merge(tags::routes())
        .merge(ingredients::routes())
        .merge(reports::routes())
        .merge(settings::routes());
    Router::new().nest("/admin", admin)
}
