//! Meal Logging Resolver: intent, meal extraction, tiered macro
//! resolution, then a single commit through the meal recorder.

pub mod extract;
pub mod intent;
pub mod macros;

use std::sync::Arc;

use bariatric_core::nutrition::{NutritionFacts, NutritionLookup};
use bariatric_core::profile::{MealEntry, MealRecorder, PatientProfile};
use tracing::{debug, info, warn};

use self::extract::{best_candidate, extract_meal_name, names_non_food};
use self::intent::IntentClassifier;
use self::macros::{StatedMacros, heuristic_estimate};
use crate::llm::LanguageModel;
use crate::state::{LoggingFailure, LoggingOutcome, MacroTier, MealIntent};

/// What the resolver decided for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub intent: MealIntent,
    pub outcome: LoggingOutcome,
    /// Lookup result when the lookup tier supplied the macros
    pub facts: Option<NutritionFacts>,
    /// Profile as persisted after a successful commit
    pub profile: Option<PatientProfile>,
}

impl Resolution {
    fn skipped(intent: MealIntent) -> Self {
        Self {
            intent,
            outcome: LoggingOutcome::NotAttempted,
            facts: None,
            profile: None,
        }
    }

    fn failed(intent: MealIntent, failure: LoggingFailure) -> Self {
        Self {
            intent,
            outcome: LoggingOutcome::Failed(failure),
            facts: None,
            profile: None,
        }
    }

    pub fn tier(&self) -> Option<MacroTier> {
        match &self.outcome {
            LoggingOutcome::Logged { tier, .. } => Some(*tier),
            _ => None,
        }
    }
}

struct Target {
    name: String,
    stated: StatedMacros,
}

pub struct MealLoggingResolver {
    recorder: Arc<dyn MealRecorder>,
    nutrition: Option<Arc<dyn NutritionLookup>>,
    classifier: IntentClassifier,
}

impl MealLoggingResolver {
    pub fn new(recorder: Arc<dyn MealRecorder>) -> Self {
        Self {
            recorder,
            nutrition: None,
            classifier: IntentClassifier::new(),
        }
    }

    pub fn with_nutrition(mut self, nutrition: Arc<dyn NutritionLookup>) -> Self {
        self.nutrition = Some(nutrition);
        self
    }

    /// Let a language model settle turns the rule table leaves open.
    pub fn with_intent_fallback(mut self, llm: LanguageModel) -> Self {
        self.classifier = self.classifier.with_fallback(llm);
        self
    }

    /// Resolve and, if possible, commit a meal for this turn.
    ///
    /// `prior` is the assistant's previous reply, searched for the referent
    /// of "log that" style turns. At most one recorder call is made.
    pub async fn resolve(&self, user_id: &str, text: &str, prior: Option<&str>) -> Resolution {
        let intent = self.classifier.classify(text, prior).await;

        let target = match intent {
            MealIntent::None => return Resolution::skipped(intent),
            MealIntent::Referential => match prior.and_then(best_candidate) {
                Some(candidate) => Target {
                    name: candidate.name,
                    // numbers the user typed beat the suggestion's own
                    stated: StatedMacros::parse(text).or(candidate.stated),
                },
                None => {
                    info!("Referential meal intent with nothing to refer to");
                    return Resolution::failed(intent, LoggingFailure::NoReferent);
                }
            },
            MealIntent::Eating | MealIntent::Recording => match extract_meal_name(text) {
                Some(name) if names_non_food(&name) => {
                    debug!(subject = %name, "Consumption phrasing about a non-food subject");
                    return Resolution::skipped(MealIntent::None);
                }
                Some(name) => Target {
                    name,
                    stated: StatedMacros::parse(text),
                },
                None => {
                    info!(?intent, "No meal name could be extracted");
                    return Resolution::failed(intent, LoggingFailure::Unverifiable);
                }
            },
        };

        let (protein, calories, tier, facts) = self.resolve_macros(&target).await;
        let meal = MealEntry::clamped(target.name, protein, calories);
        if meal.protein != protein || meal.calories != calories {
            warn!(
                meal = %meal.food,
                protein,
                calories,
                "Resolved macros out of range, clamped"
            );
        }

        match self.recorder.record(user_id, &meal).await {
            Ok(profile) => {
                info!(meal = %meal.food, ?tier, "Meal logged");
                Resolution {
                    intent,
                    outcome: LoggingOutcome::Logged {
                        meal,
                        tier,
                        protein_today: profile.protein_today,
                    },
                    facts,
                    profile: Some(profile),
                }
            }
            Err(err) => {
                warn!(error = %err, "Meal recorder rejected the write");
                Resolution {
                    facts,
                    ..Resolution::failed(intent, LoggingFailure::Downstream(err.to_string()))
                }
            }
        }
    }

    /// Stated, then looked up, then estimated.
    async fn resolve_macros(
        &self,
        target: &Target,
    ) -> (f64, f64, MacroTier, Option<NutritionFacts>) {
        if let Some((protein, calories)) = target.stated.both() {
            return (protein, calories, MacroTier::Stated, None);
        }

        if let Some(nutrition) = &self.nutrition {
            match nutrition.lookup(&target.name).await {
                Ok(facts) => {
                    if let Some((protein, calories)) = facts.protein_and_calories() {
                        return (protein, calories, MacroTier::Lookup, Some(facts));
                    }
                    debug!(meal = %target.name, "Lookup returned partial macros");
                }
                Err(err) => debug!(meal = %target.name, error = %err, "Nutrition lookup missed"),
            }
        }

        let (protein, calories) = heuristic_estimate(&target.name);
        (protein, calories, MacroTier::Heuristic, None)
    }
}
