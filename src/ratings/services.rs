use tracing::{info, warn};
use uuid::Uuid;

use super::{
    repo,
    repo_types::{Rating, RatingInput},
};
use crate::{
    cache::HOME_KEY,
    error::{AppError, AppResult},
    recipes,
    state::AppState,
};

pub fn validate(input: &RatingInput) -> AppResult<()> {
    if !(1..=5).contains(&input.rating) {
        return Err(AppError::bad_request("Rating must be between 1 and 5"));
    }
    Ok(())
}

fn comment(input: &RatingInput) -> Option<&str> {
    input.comment.as_deref().map(str::trim).filter(|c| !c.is_empty())
}

pub async fn add_rating(
    st: &AppState,
    user_id: Uuid,
    recipe_id: Uuid,
    input: RatingInput,
) -> AppResult<Rating> {
    validate(&input)?;
    if recipes::repo::find_by_id(&st.db, recipe_id).await?.is_none() {
        return Err(AppError::not_found("Recipe not found"));
    }
    let rating = repo::upsert(&st.db, user_id, recipe_id, input.rating, comment(&input)).await?;
    st.cache.remove(HOME_KEY).await;
    info!(%user_id, %recipe_id, rating = rating.rating, "rating saved");
    Ok(rating)
}

pub async fn update_rating(
    st: &AppState,
    user_id: Uuid,
    recipe_id: Uuid,
    input: RatingInput,
) -> AppResult<Rating> {
    validate(&input)?;
    let rating = repo::update(&st.db, user_id, recipe_id, input.rating, comment(&input))
        .await?
        .ok_or_else(|| AppError::not_found("Rating not found"))?;
    st.cache.remove(HOME_KEY).await;
    Ok(rating)
}

pub async fn delete_rating(
    st: &AppState,
    user_id: Uuid,
    rating_id: Uuid,
    recipe_id: Uuid,
) -> AppResult<()> {
    if !repo::delete_own(&st.db, user_id, rating_id, recipe_id).await? {
        warn!(%user_id, %rating_id, %recipe_id, "rating delete refused");
        return Err(AppError::not_found("Rating not found or unauthorized"));
    }
    st.cache.remove(HOME_KEY).await;
    info!(%user_id, %rating_id, "rating deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_range() {
        for ok in 1..=5 {
            assert!(validate(&RatingInput { rating: ok, comment: None }).is_ok());
        }
        assert!(validate(&RatingInput { rating: 0, comment: None }).is_err());
        assert!(validate(&RatingInput { rating: 6, comment: None }).is_err());
    }

    #[test]
    fn blank_comment_is_dropped() {
        let input = RatingInput { rating: 4, comment: Some("   ".into()) };
        assert_eq!(comment(&input), None);
        let input = RatingInput { rating: 4, comment: Some(" tasty ".into()) };
        assert_eq!(comment(&input), Some("tasty"));
    }
}
