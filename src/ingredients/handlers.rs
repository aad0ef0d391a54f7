use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use super::{repo, repo_types::Ingredient};
use crate::{error::AppResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/ingredients", get(list_ingredients))
}

#[instrument(skip(state))]
pub async fn list_ingredients(State(state): State<AppState>) -> AppResult<Json<Vec<Ingredient>>> {
    Ok(Json(repo::list_all(&state.db).await?))
}
