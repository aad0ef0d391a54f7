use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{Recipe, RecipeCard, RecipeTagRow, Step};
use crate::{ingredients::repo_types::Nutrition, pagination::Paged};

#[derive(Debug, Serialize)]
pub struct IngredientLine {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub unit: Option<String>,
    pub nutrition: Nutrition,
}

#[derive(Debug, Serialize)]
pub struct ViewerRating {
    pub id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetails {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub author: String,
    pub ingredients: Vec<IngredientLine>,
    pub totals: Nutrition,
    pub steps: Vec<Step>,
    pub tags: Vec<RecipeTagRow>,
    pub avg_rating: f64,
    pub rating_count: i64,
    pub favorite_count: i64,
    pub is_favorite: bool,
    pub my_rating: Option<ViewerRating>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    #[serde(flatten)]
    pub page: Paged<RecipeCard>,
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddIngredientRequest {
    pub ingredient_id: Option<Uuid>,
    pub ingredient_name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddTagRequest {
    pub tag_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AddStepRequest {
    pub step_number: Option<i32>,
    pub instruction: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedId {
    pub id: Uuid,
}
