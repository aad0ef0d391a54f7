use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Ingredient catalog entry; `default_*` values are per unit of quantity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub default_unit: Option<String>,
    pub default_calories: Option<f64>,
    pub default_protein: Option<f64>,
    pub default_fat: Option<f64>,
    pub default_carbs: Option<f64>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientInput {
    pub name: String,
    pub default_unit: Option<String>,
    pub default_calories: Option<f64>,
    pub default_protein: Option<f64>,
    pub default_fat: Option<f64>,
    pub default_carbs: Option<f64>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

impl Nutrition {
    /// `quantity` units of an ingredient with the given per-unit defaults; missing values count as zero.
    pub fn scaled(
        quantity: f64,
        calories: Option<f64>,
        protein: Option<f64>,
        fat: Option<f64>,
        carbs: Option<f64>,
    ) -> Self {
        Self {
            calories: quantity * calories.unwrap_or(0.0),
            protein: quantity * protein.unwrap_or(0.0),
            fat: quantity * fat.unwrap_or(0.0),
            carbs: quantity * carbs.unwrap_or(0.0),
        }
    }
}

impl std::ops::Add for Nutrition {
    type Output = Nutrition;
    fn add(self, o: Nutrition) -> Nutrition {
        Nutrition {
            calories: self.calories + o.calories,
            protein: self.protein + o.protein,
            fat: self.fat + o.fat,
            carbs: self.carbs + o.carbs,
        }
    }
}

impl std::iter::Sum for Nutrition {
    fn sum<I: Iterator<Item = Nutrition>>(iter: I) -> Nutrition {
        iter.fold(Nutrition::default(), |a, b| a + b)
    }
}

impl Ingredient {
    pub fn nutrition_for(&self, quantity: f64) -> Nutrition {
        Nutrition::scaled(
            quantity,
            self.default_calories,
            self.default_protein,
            self.default_fat,
            self.default_carbs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nutrition_scales_and_sums() {
        let egg = Ingredient {
            id: Uuid::new_v4(),
            name: "Egg".into(),
            default_unit: Some("pcs".into()),
            default_calories: Some(78.0),
            default_protein: Some(6.0),
            default_fat: Some(5.0),
            default_carbs: None,
            image_url: None,
        };
        let two = egg.nutrition_for(2.0);
        assert_eq!(two.calories, 156.0);
        assert_eq!(two.carbs, 0.0);
        let total: Nutrition = vec![two, egg.nutrition_for(0.5)].into_iter().sum();
        assert_eq!(total.protein, 15.0);
    }
}
