use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::repo;
use crate::{
    error::{AppError, AppResult},
    recipes::repo_types::RecipeCard,
    state::AppState,
};

const SEARCH_FAILED: &str = "An error occurred while searching recipes";

pub fn routes() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    /// Comma-separated tag ids.
    pub tags: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub tag_ids: Vec<Uuid>,
    pub results: Vec<RecipeCard>,
}

pub(crate) fn parse_tag_ids(raw: Option<&str>) -> Result<Vec<Uuid>, AppError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s).map_err(|_| AppError::bad_request(format!("Invalid tag id: {s}")))
        })
        .collect()
}

#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    let tag_ids = parse_tag_ids(q.tags.as_deref())?;
    let results = repo::search_recipes(&state.db, q.q.as_deref(), &tag_ids)
        .await
        .map_err(|e| AppError::failed(SEARCH_FAILED, e))?;
    Ok(Json(SearchResponse {
        query: q.q.unwrap_or_default(),
        tag_ids,
        results,
    }))
}
