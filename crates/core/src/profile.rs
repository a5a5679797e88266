//! Patient profile model and the profile-store collaborator traits.
//!
//! The profile store has whole-document semantics: callers read the
//! profile, modify it, and write the replacement back. There is no
//! optimistic-concurrency check; two concurrent writers for the same user
//! race and the last write wins.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProfileStoreError;

/// Upper bound for protein recorded for a single meal, in grams.
pub const MAX_MEAL_PROTEIN_G: f64 = 120.0;

/// Upper bound for calories recorded for a single meal, in kcal.
pub const MAX_MEAL_CALORIES: f64 = 1500.0;

/// One logged meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub food: String,
    pub protein: f64,
    pub calories: f64,
}

impl MealEntry {
    /// Build an entry with macros clamped into `[0, MAX_MEAL_*]`.
    ///
    /// Non-finite inputs are stored as zero.
    pub fn clamped(food: impl Into<String>, protein: f64, calories: f64) -> Self {
        Self {
            food: food.into(),
            protein: clamp_macro(protein, MAX_MEAL_PROTEIN_G),
            calories: clamp_macro(calories, MAX_MEAL_CALORIES),
        }
    }

    /// One-line human summary, e.g. `protein shake (30g protein, 200 kcal)`.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}g protein, {} kcal)",
            self.food,
            round_display(self.protein),
            round_display(self.calories)
        )
    }
}

fn clamp_macro(value: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, max)
    } else {
        0.0
    }
}

fn round_display(value: f64) -> String {
    if (value - value.round()).abs() < 0.05 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value:.1}")
    }
}

/// Structured patient attributes carried between turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    /// Surgery date as `YYYY-MM-DD`
    #[serde(default, alias = "surgeryDate", skip_serializing_if = "Option::is_none")]
    pub surgery_date: Option<String>,

    #[serde(default, alias = "dietType", skip_serializing_if = "Option::is_none")]
    pub diet_type: Option<String>,

    #[serde(default, alias = "activityLevel", skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<String>,

    #[serde(default)]
    pub allergies: BTreeSet<String>,

    #[serde(default, alias = "dislikedFoods")]
    pub disliked_foods: BTreeSet<String>,

    #[serde(default, alias = "todaysMeals")]
    pub todays_meals: Vec<MealEntry>,

    /// Running protein total for today, in grams
    #[serde(default, alias = "proteinToday")]
    pub protein_today: f64,
}

impl PatientProfile {
    /// Append a meal and bump the running protein total.
    pub fn record_meal(&mut self, meal: MealEntry) {
        self.protein_today += meal.protein;
        self.todays_meals.push(meal);
    }

    /// Every food the patient must not be offered: allergies first, then dislikes.
    pub fn excluded_foods(&self) -> impl Iterator<Item = &str> {
        self.allergies
            .iter()
            .chain(self.disliked_foods.iter())
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Render the profile for an explicit "show my data" request.
    pub fn format_block(&self, phase_label: Option<&str>) -> String {
        fn or_unset(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("not set")
        }
        fn join(set: &BTreeSet<String>) -> String {
            if set.is_empty() {
                "none".into()
            } else {
                set.iter().cloned().collect::<Vec<_>>().join(", ")
            }
        }

        let mut out = String::from("Here is your profile:\n");
        out.push_str(&format!("- Surgery date: {}\n", or_unset(&self.surgery_date)));
        if let Some(phase) = phase_label {
            out.push_str(&format!("- Current phase: {phase}\n"));
        }
        out.push_str(&format!("- Diet type: {}\n", or_unset(&self.diet_type)));
        out.push_str(&format!("- Activity level: {}\n", or_unset(&self.activity_level)));
        out.push_str(&format!("- Allergies: {}\n", join(&self.allergies)));
        out.push_str(&format!("- Disliked foods: {}\n", join(&self.disliked_foods)));
        out.push_str(&format!(
            "- Protein today: {}g\n",
            round_display(self.protein_today)
        ));
        if self.todays_meals.is_empty() {
            out.push_str("- Meals logged today: none");
        } else {
            out.push_str("- Meals logged today:");
            for meal in &self.todays_meals {
                out.push_str(&format!("\n  - {}", meal.summary()));
            }
        }
        out
    }
}

/// The profile store: whole-profile reads and replacements, plus the
/// advisory memory string.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The backend name (e.g., "http", "in_memory").
    fn name(&self) -> &str;

    /// Fetch the profile for `user_id`.
    async fn get_profile(&self, user_id: &str) -> Result<PatientProfile, ProfileStoreError>;

    /// Replace the profile for `user_id`.
    async fn put_profile(
        &self,
        user_id: &str,
        profile: &PatientProfile,
    ) -> Result<(), ProfileStoreError>;

    /// The stored memory summary for `user_id`. Backends that keep no
    /// memory answer `None`.
    async fn get_memory(&self, _user_id: &str) -> Result<Option<String>, ProfileStoreError> {
        Ok(None)
    }

    /// Replace the memory summary for `user_id`.
    async fn put_memory(&self, user_id: &str, memory: &str) -> Result<(), ProfileStoreError>;
}

/// Persists a logged meal for a user.
#[async_trait]
pub trait MealRecorder: Send + Sync {
    /// Record `meal`, returning the profile as persisted.
    async fn record(
        &self,
        user_id: &str,
        meal: &MealEntry,
    ) -> Result<PatientProfile, ProfileStoreError>;
}
