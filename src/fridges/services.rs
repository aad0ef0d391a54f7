use std::collections::HashMap;

use time::{Date, Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{AddItemRequest, FridgeItemView, FridgeView},
    repo,
    repo_types::Fridge,
};
use crate::{
    error::{AppError, AppResult},
    ingredients,
    recipes::repo_types::RecipeCard,
    state::AppState,
};

pub const DEFAULT_SUGGESTIONS: i64 = 6;

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Upper bound on day offsets accepted from clients.
pub const MAX_DAYS_AHEAD: i64 = 36_500;

/// `today + days`, rejecting offsets outside `0..=MAX_DAYS_AHEAD`.
pub fn days_ahead(today: Date, days: i64) -> AppResult<Date> {
    if !(0..=MAX_DAYS_AHEAD).contains(&days) {
        return Err(AppError::bad_request(format!(
            "Days must be between 0 and {MAX_DAYS_AHEAD}"
        )));
    }
    today
        .checked_add(Duration::days(days))
        .ok_or_else(|| AppError::bad_request("Date out of range"))
}

/// Explicit date wins; otherwise `today + days` for a positive `days_to_expire`.
pub fn resolve_expiration(
    explicit: Option<Date>,
    days_to_expire: Option<i64>,
    today: Date,
) -> AppResult<Option<Date>> {
    if explicit.is_some() {
        return Ok(explicit);
    }
    match days_to_expire {
        Some(d) if d > 0 => days_ahead(today, d).map(Some),
        _ => Ok(None),
    }
}

async fn owned_fridge(st: &AppState, user_id: Uuid, fridge_id: Uuid) -> AppResult<Fridge> {
    let fridge = repo::find_by_id(&st.db, fridge_id)
        .await?
        .ok_or_else(|| AppError::not_found("Fridge not found"))?;
    if fridge.user_id != user_id {
        warn!(%fridge_id, %user_id, "fridge access by non-owner");
        return Err(AppError::not_found("Fridge not found"));
    }
    Ok(fridge)
}

pub async fn list_fridges(st: &AppState, user_id: Uuid) -> AppResult<Vec<FridgeView>> {
    let fridges = repo::list_for_user(&st.db, user_id).await?;
    let ids: Vec<Uuid> = fridges.iter().map(|f| f.id).collect();
    let mut by_fridge: HashMap<Uuid, Vec<FridgeItemView>> = HashMap::new();
    for row in repo::items_for(&st.db, &ids).await? {
        by_fridge.entry(row.fridge_id).or_default().push(row.into());
    }
    Ok(fridges
        .into_iter()
        .map(|f| {
            let items = by_fridge.remove(&f.id).unwrap_or_default();
            FridgeView::new(f, items)
        })
        .collect())
}

pub async fn create_fridge(st: &AppState, user_id: Uuid, name: &str) -> AppResult<FridgeView> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Fridge name is required"));
    }
    let fridge = repo::insert(&st.db, user_id, name).await?;
    info!(%user_id, fridge_id = %fridge.id, "fridge created");
    Ok(FridgeView::new(fridge, Vec::new()))
}

pub async fn delete_fridge(st: &AppState, user_id: Uuid, fridge_id: Uuid) -> AppResult<()> {
    if !repo::delete_owned(&st.db, user_id, fridge_id).await? {
        return Err(AppError::not_found("Fridge not found"));
    }
    info!(%user_id, %fridge_id, "fridge deleted");
    Ok(())
}

pub async fn add_item(
    st: &AppState,
    user_id: Uuid,
    fridge_id: Uuid,
    req: AddItemRequest,
) -> AppResult<Uuid> {
    let expiration = resolve_expiration(req.expiration_date, req.days_to_expire, today())?;
    let name = req.ingredient_name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Ingredient name is required"));
    }
    let quantity = req.quantity.unwrap_or(1.0);
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(AppError::bad_request("Quantity must be a non-negative number"));
    }
    owned_fridge(st, user_id, fridge_id).await?;

    let ingredient = ingredients::repo::find_or_create(&st.db, name).await?;
    let unit = req
        .unit
        .filter(|u| !u.trim().is_empty())
        .or(ingredient.default_unit);

    let item_id = repo::insert_item(
        &st.db,
        fridge_id,
        ingredient.id,
        quantity,
        unit.as_deref(),
        expiration,
    )
    .await?;
    info!(%fridge_id, %item_id, ingredient_id = %ingredient.id, "fridge item added");
    Ok(item_id)
}

pub async fn remove_item(st: &AppState, user_id: Uuid, fridge_id: Uuid, item_id: Uuid) -> AppResult<()> {
    owned_fridge(st, user_id, fridge_id).await?;
    if !repo::delete_item(&st.db, fridge_id, item_id).await? {
        return Err(AppError::not_found("Item not found"));
    }
    Ok(())
}

pub async fn expiring_soon(
    st: &AppState,
    user_id: Uuid,
    fridge_id: Uuid,
    days: i64,
) -> AppResult<Vec<FridgeItemView>> {
    let until = days_ahead(today(), days.max(0))?;
    owned_fridge(st, user_id, fridge_id).await?;
    let rows = repo::expiring(&st.db, fridge_id, until).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn recipe_suggestions(
    st: &AppState,
    user_id: Uuid,
    fridge_id: Uuid,
) -> AppResult<Vec<RecipeCard>> {
    owned_fridge(st, user_id, fridge_id).await?;
    Ok(repo::suggestions(&st.db, fridge_id, DEFAULT_SUGGESTIONS).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn expiration_resolution() {
        let today = date!(2026 - 10 - 16);
        assert_eq!(resolve_expiration(None, Some(3), today).unwrap(), Some(date!(2026 - 10 - 19)));
        assert_eq!(resolve_expiration(None, Some(0), today).unwrap(), None);
        assert_eq!(resolve_expiration(None, Some(-2), today).unwrap(), None);
        assert_eq!(resolve_expiration(None, None, today).unwrap(), None);
        let explicit = date!(2027 - 01 - 01);
        assert_eq!(resolve_expiration(Some(explicit), Some(i64::MAX), today).unwrap(), Some(explicit));
    }

    #[test]
    fn huge_day_offsets_are_rejected_not_panicking() {
        let today = date!(2026 - 10 - 16);
        assert!(matches!(
            resolve_expiration(None, Some(i64::MAX), today),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(days_ahead(today, MAX_DAYS_AHEAD + 1), Err(AppError::BadRequest(_))));
        assert!(matches!(days_ahead(today, -1), Err(AppError::BadRequest(_))));
        assert_eq!(days_ahead(today, 0).unwrap(), today);
        assert_eq!(
            days_ahead(today, MAX_DAYS_AHEAD).unwrap(),
            today + Duration::days(MAX_DAYS_AHEAD)
        );
    }
}
