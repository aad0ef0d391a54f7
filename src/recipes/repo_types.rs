use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub servings: Option<i32>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub total_calories: Option<f64>,
    pub total_protein: Option<f64>,
    pub total_fat: Option<f64>,
    pub total_carbs: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Recipe plus author and engagement numbers, as shown in lists and cards.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub servings: Option<i32>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    pub avg_rating: f64,
    pub rating_count: i64,
    pub favorite_count: i64,
}

/// A recipe ingredient line joined with its catalog entry.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeIngredientRow {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub default_calories: Option<f64>,
    pub default_protein: Option<f64>,
    pub default_fat: Option<f64>,
    pub default_carbs: Option<f64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Step {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub step_number: i32,
    pub instruction: String,
    pub image_url: Option<String>,
}

/// `id` is the recipe-tag link, `tag_id` the tag itself.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeTagRow {
    pub id: Uuid,
    pub tag_id: Uuid,
    pub name: String,
}

/// Editable recipe fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeInput {
    pub title: String,
    pub description: Option<String>,
    pub servings: Option<i32>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, FromRow)]
pub struct RecipeStats {
    pub avg_rating: f64,
    pub rating_count: i64,
    pub favorite_count: i64,
}
