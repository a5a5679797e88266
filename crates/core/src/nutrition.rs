//! Nutrition lookup trait: verified macro data from an external food
//! database.
//!
//! A lookup is a single outbound query with no retries and no cache. Callers
//! treat any error as "unknown", never as fatal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NutritionError;

/// Macro data for one food as reported by the food database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    /// Product or food name as the database knows it
    pub name: String,

    /// Serving size the values refer to (e.g., "100 g", "1 cup (240 ml)")
    pub serving_size: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_g: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs_g: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_g: Option<f64>,
}

impl NutritionFacts {
    /// Protein and calories, only when both were reported.
    pub fn protein_and_calories(&self) -> Option<(f64, f64)> {
        match (self.protein_g, self.calories) {
            (Some(p), Some(c)) => Some((p, c)),
            _ => None,
        }
    }

    /// Render as a compact context block for the synthesizer.
    pub fn to_context_block(&self) -> String {
        fn fmt(v: Option<f64>, unit: &str) -> String {
            v.map(|v| format!("{v:.1}{unit}"))
                .unwrap_or_else(|| "unknown".into())
        }
        format!(
            "{} (per {}): calories {}, protein {}, carbs {}, fat {}",
            self.name,
            self.serving_size,
            fmt(self.calories, " kcal"),
            fmt(self.protein_g, " g"),
            fmt(self.carbs_g, " g"),
            fmt(self.fat_g, " g"),
        )
    }
}

/// The core NutritionLookup trait.
#[async_trait]
pub trait NutritionLookup: Send + Sync {
    /// The backend name (e.g., "openfoodfacts").
    fn name(&self) -> &str;

    /// Look up macros for `food_name`.
    async fn lookup(&self, food_name: &str) -> Result<NutritionFacts, NutritionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yogurt() -> NutritionFacts {
        NutritionFacts {
            name: "Greek yogurt".into(),
            serving_size: "100 g".into(),
            calories: Some(59.0),
            protein_g: Some(10.3),
            carbs_g: Some(3.6),
            fat_g: None,
        }
    }

    #[test]
    fn both_macros_required() {
        assert_eq!(yogurt().protein_and_calories(), Some((10.3, 59.0)));

        let partial = NutritionFacts {
            calories: None,
            ..yogurt()
        };
        assert!(partial.protein_and_calories().is_none());
    }

    #[test]
    fn context_block_marks_unknown_values() {
        let block = yogurt().to_context_block();
        assert!(block.contains("Greek yogurt (per 100 g)"));
        assert!(block.contains("protein 10.3 g"));
        assert!(block.contains("fat unknown"));
    }
}
