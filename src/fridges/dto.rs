use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{Fridge, FridgeItemRow};
use crate::ingredients::repo_types::Nutrition;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Serialize)]
pub struct FridgeItemView {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub unit: Option<String>,
    #[serde(with = "iso_date::option")]
    pub expiration_date: Option<Date>,
    pub nutrition: Nutrition,
}

impl From<FridgeItemRow> for FridgeItemView {
    fn from(r: FridgeItemRow) -> Self {
        let quantity = r.quantity.unwrap_or(0.0);
        Self {
            id: r.id,
            ingredient_id: r.ingredient_id,
            name: r.ingredient_name,
            quantity,
            unit: r.unit,
            expiration_date: r.expiration_date,
            nutrition: Nutrition::scaled(
                quantity,
                r.default_calories,
                r.default_protein,
                r.default_fat,
                r.default_carbs,
            ),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FridgeView {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub items: Vec<FridgeItemView>,
}

impl FridgeView {
    pub fn new(f: Fridge, items: Vec<FridgeItemView>) -> Self {
        Self {
            id: f.id,
            name: f.name,
            created_at: f.created_at,
            items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFridgeRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub ingredient_name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub expiration_date: Option<Date>,
    pub days_to_expire: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    3
}

#[derive(Debug, Serialize)]
pub struct CreatedItem {
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn add_item_accepts_iso_dates() {
        let req: AddItemRequest = serde_json::from_str(
            r#"{"ingredient_name":"Milk","expiration_date":"2026-10-20"}"#,
        )
        .unwrap();
        assert_eq!(req.expiration_date, Some(date!(2026 - 10 - 20)));
        assert_eq!(req.quantity, None);

        let req: AddItemRequest = serde_json::from_str(r#"{"ingredient_name":"Milk"}"#).unwrap();
        assert_eq!(req.expiration_date, None);
    }

    #[test]
    fn item_view_scales_nutrition() {
        let view = FridgeItemView::from(FridgeItemRow {
            id: Uuid::new_v4(),
            fridge_id: Uuid::new_v4(),
            ingredient_id: Uuid::new_v4(),
            ingredient_name: "Milk".into(),
            quantity: Some(2.0),
            unit: Some("l".into()),
            expiration_date: Some(date!(2026 - 10 - 20)),
            default_calories: Some(640.0),
            default_protein: Some(33.0),
            default_fat: None,
            default_carbs: Some(48.0),
        });
        assert_eq!(view.nutrition.calories, 1280.0);
        assert_eq!(view.nutrition.fat, 0.0);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["expiration_date"], "2026-10-20");
    }
}
