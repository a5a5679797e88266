//! Nutrition stage: verified macros for a food the user asked about, or
//! the facts the resolver already fetched while logging.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use bariatric_core::nutrition::NutritionLookup;
use regex_lite::Regex;
use tracing::{debug, warn};

use super::Stage;
use crate::meal_logging::extract::clean_food_phrase;
use crate::state::{TurnState, TurnUpdate};

static HOW_MUCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bhow\s+(?:much|many)\s+(?:protein|calories|kcals?|carbs|fat|sugar)\s+(?:is|are|does|do)?\s*(?:there\s+)?(?:in|on)\s+(.+)",
    )
    .unwrap_or_else(|err| panic!("invalid how-much regex: {err}"))
});

static FACTS_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:calories|protein|macros|nutrition(?:al)?\s+(?:facts|info|information|value)|nutrients)\s+(?:in|of|for)\s+(.+)",
    )
    .unwrap_or_else(|err| panic!("invalid facts-of regex: {err}"))
});

/// The food a nutrition question is about, if the turn is one.
pub fn nutrition_question_food(text: &str) -> Option<String> {
    [&*HOW_MUCH, &*FACTS_OF]
        .iter()
        .find_map(|re| re.captures(text).and_then(|c| c.get(1)))
        .and_then(|m| clean_food_phrase(m.as_str()))
        .filter(|food| !matches!(food.as_str(), "it" | "that" | "this" | "them" | "my"))
}

pub struct NutritionStage {
    lookup: Option<Arc<dyn NutritionLookup>>,
}

impl NutritionStage {
    pub fn new(lookup: Option<Arc<dyn NutritionLookup>>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl Stage for NutritionStage {
    fn name(&self) -> &'static str {
        "nutrition"
    }

    async fn run(&self, state: &TurnState) -> TurnUpdate {
        if let Some(facts) = &state.nutrition_facts {
            return TurnUpdate {
                nutrition_context: Some(facts.to_context_block()),
                ..Default::default()
            };
        }

        let Some(lookup) = &self.lookup else {
            return TurnUpdate::default();
        };
        let Some(food) = nutrition_question_food(state.user_text()) else {
            return TurnUpdate::default();
        };

        match lookup.lookup(&food).await {
            Ok(facts) => {
                debug!(food = %food, source = lookup.name(), "Nutrition facts found");
                TurnUpdate {
                    nutrition_context: Some(facts.to_context_block()),
                    nutrition_facts: Some(facts),
                    ..Default::default()
                }
            }
            Err(e) => {
                warn!(food = %food, error = %e, "Nutrition lookup failed, continuing without facts");
                TurnUpdate::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FakeNutrition;

    #[test]
    fn detects_food_questions() {
        assert_eq!(
            nutrition_question_food("How much protein is in greek yogurt?").as_deref(),
            Some("greek yogurt")
        );
        assert_eq!(
            nutrition_question_food("calories in a cup of cottage cheese").as_deref(),
            Some("cottage cheese")
        );
        assert_eq!(
            nutrition_question_food("nutrition facts for tofu, please").as_deref(),
            Some("tofu")
        );
        assert!(nutrition_question_food("How much protein do I need per day?").is_none());
        assert!(nutrition_question_food("how much protein is in it?").is_none());
    }

    #[tokio::test]
    async fn looks_up_asked_food() {
        let fake = Arc::new(FakeNutrition::default().with("greek yogurt", 10.3, 59.0));
        let stage = NutritionStage::new(Some(fake.clone()));

        let update = stage
            .run(&TurnState::new("1", "How much protein is in greek yogurt?"))
            .await;

        assert!(update.nutrition_context.unwrap().contains("greek yogurt"));
        assert_eq!(fake.lookup_count(), 1);
    }

    #[tokio::test]
    async fn reuses_facts_from_logging() {
        let fake = Arc::new(FakeNutrition::default());
        let stage = NutritionStage::new(Some(fake.clone()));
        let mut state = TurnState::new("1", "How much protein is in greek yogurt?");
        state.nutrition_facts = Some(bariatric_core::NutritionFacts {
            name: "Greek yogurt".into(),
            serving_size: "100 g".into(),
            calories: Some(59.0),
            protein_g: Some(10.3),
            carbs_g: None,
            fat_g: None,
        });

        let update = stage.run(&state).await;

        assert!(update.nutrition_context.is_some());
        assert!(update.nutrition_facts.is_none());
        assert_eq!(fake.lookup_count(), 0);
    }

    #[tokio::test]
    async fn lookup_miss_contributes_nothing() {
        let stage = NutritionStage::new(Some(Arc::new(FakeNutrition::default())));
        let update = stage
            .run(&TurnState::new("1", "calories in dragonfruit"))
            .await;
        assert!(update.nutrition_context.is_none());
    }
}
