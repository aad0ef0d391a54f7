use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use super::services::{self, HomeData};
use crate::{error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/home", get(home))
}

#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> AppResult<Json<HomeData>> {
    Ok(Json(services::get_home(&state).await?))
}
