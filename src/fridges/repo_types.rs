use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Fridge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
}

/// A fridge item joined with its ingredient.
#[derive(Debug, Clone, FromRow)]
pub struct FridgeItemRow {
    pub id: Uuid,
    pub fridge_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub expiration_date: Option<Date>,
    pub default_calories: Option<f64>,
    pub default_protein: Option<f64>,
    pub default_fat: Option<f64>,
    pub default_carbs: Option<f64>,
}
