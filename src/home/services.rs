use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::repo::{self, PopularTag};
use crate::{cache::HOME_KEY, recipes::repo_types::RecipeCard, state::AppState};

pub const HOME_TTL: Duration = Duration::from_secs(5 * 60);
const POPULAR_TAGS: i64 = 12;
const TOP_FAVORITES: i64 = 6;
const RECENT: i64 = 12;

#[derive(Debug, Clone, Serialize)]
pub struct HomeData {
    pub popular_tags: Vec<PopularTag>,
    pub top_favorites: Vec<RecipeCard>,
    pub recent_recipes: Vec<RecipeCard>,
}

async fn load(st: &AppState) -> anyhow::Result<HomeData> {
    debug!("building home page data");
    Ok(HomeData {
        popular_tags: repo::popular_tags(&st.db, POPULAR_TAGS).await?,
        top_favorites: repo::top_favorites(&st.db, TOP_FAVORITES).await?,
        recent_recipes: repo::recent_recipes(&st.db, RECENT).await?,
    })
}

/// Served from cache for up to five minutes; recipe, rating and favorite writes evict it.
pub async fn get_home(st: &AppState) -> anyhow::Result<HomeData> {
    st.cache
        .get_or_try_insert_with(HOME_KEY, HOME_TTL, || load(st))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cached_home_is_served_without_db() {
        let state = AppState::fake();
        let data = HomeData {
            popular_tags: vec![],
            top_favorites: vec![],
            recent_recipes: vec![],
        };
        state.cache.insert(HOME_KEY, data, HOME_TTL).await;
        // the lazy pool would fail if touched
        let home = get_home(&state).await.unwrap();
        assert!(home.recent_recipes.is_empty());
    }
}
