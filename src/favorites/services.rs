use tracing::info;
use uuid::Uuid;

use super::repo;
use crate::{
    cache::HOME_KEY,
    error::{AppError, AppResult},
    recipes,
    state::AppState,
};

async fn ensure_recipe(st: &AppState, recipe_id: Uuid) -> AppResult<()> {
    if recipes::repo::find_by_id(&st.db, recipe_id).await?.is_none() {
        return Err(AppError::not_found("Recipe not found"));
    }
    Ok(())
}

pub async fn add_favorite(st: &AppState, user_id: Uuid, recipe_id: Uuid) -> AppResult<()> {
    ensure_recipe(st, recipe_id).await?;
    if !repo::insert(&st.db, user_id, recipe_id).await? {
        return Err(AppError::conflict("Recipe is already in favorites"));
    }
    st.cache.remove(HOME_KEY).await;
    info!(%user_id, %recipe_id, "favorite added");
    Ok(())
}

pub async fn remove_favorite(st: &AppState, user_id: Uuid, recipe_id: Uuid) -> AppResult<bool> {
    let removed = repo::delete(&st.db, user_id, recipe_id).await?;
    if removed {
        st.cache.remove(HOME_KEY).await;
        info!(%user_id, %recipe_id, "favorite removed");
    }
    Ok(removed)
}

/// Returns the new state: `true` when the recipe is now a favorite.
pub async fn toggle_favorite(st: &AppState, user_id: Uuid, recipe_id: Uuid) -> AppResult<bool> {
    if remove_favorite(st, user_id, recipe_id).await? {
        return Ok(false);
    }
    match add_favorite(st, user_id, recipe_id).await {
        Ok(()) => Ok(true),
        // lost a race with a concurrent add
        Err(AppError::Conflict(_)) => Ok(true),
        Err(e) => Err(e),
    }
}
