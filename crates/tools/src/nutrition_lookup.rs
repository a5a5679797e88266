//! Nutrition lookup against the Open Food Facts search API.
//!
//! One GET per lookup, first product only. Values are per serving when the
//! product reports serving data, otherwise per 100 g.

use std::time::Duration;

use async_trait::async_trait;
use bariatric_core::error::NutritionError;
use bariatric_core::nutrition::{NutritionFacts, NutritionLookup};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_SEARCH_URL: &str = "https://world.openfoodfacts.org/cgi/search.pl";

pub struct OpenFoodFactsLookup {
    search_url: String,
    client: reqwest::Client,
}

impl OpenFoodFactsLookup {
    pub fn new(search_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bariatric-gpt/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            search_url: search_url.into(),
            client,
        }
    }

    /// Turn a search response body into facts for the first product.
    fn parse(food_name: &str, body: SearchResponse) -> Result<NutritionFacts, NutritionError> {
        let product = body
            .products
            .into_iter()
            .next()
            .ok_or_else(|| NutritionError::NotFound(food_name.to_string()))?;

        let n = &product.nutriments;
        let name = product
            .product_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| food_name.to_string());

        let per_serving = n.energy_kcal_serving.is_some() && n.proteins_serving.is_some();
        let facts = if per_serving {
            NutritionFacts {
                name,
                serving_size: product
                    .serving_size
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| "1 serving".into()),
                calories: n.energy_kcal_serving,
                protein_g: n.proteins_serving,
                carbs_g: n.carbohydrates_serving,
                fat_g: n.fat_serving,
            }
        } else {
            NutritionFacts {
                name,
                serving_size: "100 g".into(),
                calories: n.energy_kcal_100g,
                protein_g: n.proteins_100g,
                carbs_g: n.carbohydrates_100g,
                fat_g: n.fat_100g,
            }
        };

        if facts.calories.is_none() && facts.protein_g.is_none() {
            return Err(NutritionError::NotFound(food_name.to_string()));
        }
        Ok(facts)
    }
}

#[async_trait]
impl NutritionLookup for OpenFoodFactsLookup {
    fn name(&self) -> &str {
        "openfoodfacts"
    }

    async fn lookup(&self, food_name: &str) -> Result<NutritionFacts, NutritionError> {
        let food_name = food_name.trim();
        if food_name.is_empty() {
            return Err(NutritionError::NotFound(String::new()));
        }

        debug!(food = %food_name, "Querying food database");

        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("search_terms", food_name),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
                ("page_size", "1"),
            ])
            .send()
            .await
            .map_err(|e| NutritionError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(NutritionError::ApiError {
                status_code: status,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| NutritionError::InvalidResponse(e.to_string()))?;

        Self::parse(food_name, body)
    }
}

// --- Open Food Facts API types (internal) ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct Product {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    serving_size: Option<String>,
    #[serde(default)]
    nutriments: Nutriments,
}

#[derive(Debug, Default, Deserialize)]
struct Nutriments {
    #[serde(default, rename = "energy-kcal_100g")]
    energy_kcal_100g: Option<f64>,
    #[serde(default, rename = "energy-kcal_serving")]
    energy_kcal_serving: Option<f64>,
    #[serde(default)]
    proteins_100g: Option<f64>,
    #[serde(default)]
    proteins_serving: Option<f64>,
    #[serde(default)]
    carbohydrates_100g: Option<f64>,
    #[serde(default)]
    carbohydrates_serving: Option<f64>,
    #[serde(default)]
    fat_100g: Option<f64>,
    #[serde(default)]
    fat_serving: Option<f64>,
}
