use anyhow::Context;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::repo_types::{Fridge, FridgeItemRow};
use crate::recipes::{repo::CARD_SELECT, repo_types::RecipeCard};

const ITEM_SELECT: &str = r#"
    SELECT fi.id, fi.fridge_id, fi.ingredient_id, i.name AS ingredient_name, fi.quantity, fi.unit,
           fi.expiration_date, i.default_calories, i.default_protein, i.default_fat, i.default_carbs
    FROM fridge_ingredients fi
    JOIN ingredients i ON i.id = fi.ingredient_id
"#;

pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Fridge>> {
    let rows = sqlx::query_as::<_, Fridge>(
        "SELECT id, user_id, name, created_at FROM fridges WHERE user_id = $1 ORDER BY name",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list fridges")?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Fridge>> {
    let row = sqlx::query_as::<_, Fridge>(
        "SELECT id, user_id, name, created_at FROM fridges WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find fridge")?;
    Ok(row)
}

pub async fn insert(db: &PgPool, user_id: Uuid, name: &str) -> anyhow::Result<Fridge> {
    let row = sqlx::query_as::<_, Fridge>(
        r#"
        INSERT INTO fridges (user_id, name, created_at) VALUES ($1, $2, now())
        RETURNING id, user_id, name, created_at
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_one(db)
    .await
    .context("insert fridge")?;
    Ok(row)
}

/// Items cascade.
pub async fn delete_owned(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM fridges WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete fridge")?;
    Ok(res.rows_affected() > 0)
}

/// Items of several fridges at once, ordered by ingredient name.
pub async fn items_for(db: &PgPool, fridge_ids: &[Uuid]) -> anyhow::Result<Vec<FridgeItemRow>> {
    let rows = sqlx::query_as::<_, FridgeItemRow>(&format!(
        "{ITEM_SELECT} WHERE fi.fridge_id = ANY($1) ORDER BY i.name"
    ))
    .bind(fridge_ids)
    .fetch_all(db)
    .await
    .context("list fridge items")?;
    Ok(rows)
}

pub async fn insert_item(
    db: &PgPool,
    fridge_id: Uuid,
    ingredient_id: Uuid,
    quantity: f64,
    unit: Option<&str>,
    expiration_date: Option<Date>,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO fridge_ingredients (fridge_id, ingredient_id, quantity, unit, expiration_date)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(fridge_id)
    .bind(ingredient_id)
    .bind(quantity)
    .bind(unit)
    .bind(expiration_date)
    .fetch_one(db)
    .await
    .context("insert fridge item")?;
    Ok(id)
}

pub async fn delete_item(db: &PgPool, fridge_id: Uuid, item_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM fridge_ingredients WHERE id = $1 AND fridge_id = $2")
        .bind(item_id)
        .bind(fridge_id)
        .execute(db)
        .await
        .context("delete fridge item")?;
    Ok(res.rows_affected() > 0)
}

/// Items expiring on or before `until`, soonest first.
pub async fn expiring(db: &PgPool, fridge_id: Uuid, until: Date) -> anyhow::Result<Vec<FridgeItemRow>> {
    let rows = sqlx::query_as::<_, FridgeItemRow>(&format!(
        r#"
        {ITEM_SELECT}
        WHERE fi.fridge_id = $1 AND fi.expiration_date IS NOT NULL AND fi.expiration_date <= $2
        ORDER BY fi.expiration_date
        "#
    ))
    .bind(fridge_id)
    .bind(until)
    .fetch_all(db)
    .await
    .context("list expiring items")?;
    Ok(rows)
}

/// Recipes using at least one ingredient stored in the fridge.
pub async fn suggestions(db: &PgPool, fridge_id: Uuid, take: i64) -> anyhow::Result<Vec<RecipeCard>> {
    let rows = sqlx::query_as::<_, RecipeCard>(&format!(
        r#"
        {CARD_SELECT}
        WHERE EXISTS (
            SELECT 1 FROM recipe_ingredients ri
            JOIN fridge_ingredients fi ON fi.ingredient_id = ri.ingredient_id
            WHERE ri.recipe_id = r.id AND fi.fridge_id = $1
        )
        ORDER BY r.updated_at DESC NULLS LAST
        LIMIT $2
        "#
    ))
    .bind(fridge_id)
    .bind(take)
    .fetch_all(db)
    .await
    .context("fridge recipe suggestions")?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fridges::services::days_ahead, ingredients, testing};
    use time::OffsetDateTime;

    #[sqlx::test]
    #[ignore = "needs Postgres at DATABASE_URL"]
    async fn expiring_stops_at_cutoff_soonest_first(pool: PgPool) -> anyhow::Result<()> {
        let owner = testing::user(&pool, "owner").await?;
        let fridge = insert(&pool, owner, "Kitchen").await?;
        let milk = ingredients::repo::find_or_create(&pool, "Milk").await?;
        let today = OffsetDateTime::now_utc().date();

        let mut expected = Vec::new();
        for offset in [5, 3, 1, 0] {
            let expires = days_ahead(today, offset)?;
            let item = insert_item(&pool, fridge.id, milk.id, 1.0, None, Some(expires)).await?;
            if offset <= 3 {
                expected.push(item);
            }
        }
        insert_item(&pool, fridge.id, milk.id, 1.0, Some("l"), None).await?;
        expected.reverse();

        let rows = expiring(&pool, fridge.id, days_ahead(today, 3)?).await?;
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, expected);
        assert!(rows.windows(2).all(|w| w[0].expiration_date <= w[1].expiration_date));
        assert!(rows.iter().all(|r| r.ingredient_name == "Milk"));

        let other = insert(&pool, owner, "Garage").await?;
        assert!(expiring(&pool, other.id, days_ahead(today, 3)?).await?.is_empty());
        Ok(())
    }
}
