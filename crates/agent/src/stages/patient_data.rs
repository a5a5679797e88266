//! Patient-Data stage: profile hydration, "show my data" requests, and the
//! Meal Logging Resolver.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use bariatric_core::error::ProfileStoreError;
use bariatric_core::profile::{PatientProfile, ProfileStore};
use regex_lite::Regex;
use tracing::{debug, warn};

use super::Stage;
use crate::meal_logging::MealLoggingResolver;
use crate::phase::PhaseOfCare;
use crate::state::{LoggingOutcome, TurnState, TurnUpdate};

static PROFILE_REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:show|view|see|display|check|give|tell)\b(?:\s+me)?\s+(?:all\s+)?my\s+(?:data|profile|info|information|details|stats|meal\s+log|log)\b|\bwhat(?:'s|\s+is)\s+(?:in\s+)?my\s+(?:data|profile)\b|\bwhat\s+(?:have|did)\s+i\s+(?:eaten|eat|logged)\b",
    )
    .unwrap_or_else(|err| panic!("invalid profile-request regex: {err}"))
});

const NO_PROFILE: &str = "I don't have any profile data for you yet. \
Once your care team sets up your profile, or you log a meal, I can show it here.";

/// An explicit request to see the stored profile or today's meals.
pub fn is_profile_request(text: &str) -> bool {
    PROFILE_REQUEST.is_match(text)
}

pub fn phase_label(profile: &PatientProfile) -> Option<String> {
    profile
        .surgery_date
        .as_deref()
        .and_then(PhaseOfCare::current)
        .map(|phase| phase.label())
}

pub struct PatientDataStage {
    resolver: MealLoggingResolver,
    store: Option<Arc<dyn ProfileStore>>,
}

impl PatientDataStage {
    pub fn new(resolver: MealLoggingResolver) -> Self {
        Self {
            resolver,
            store: None,
        }
    }

    /// Fetch the profile when the request did not carry one.
    pub fn with_profile_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.store = Some(store);
        self
    }

    async fn hydrate(&self, user_id: &str) -> Option<PatientProfile> {
        let store = self.store.as_ref()?;
        match store.get_profile(user_id).await {
            Ok(profile) => Some(profile),
            Err(ProfileStoreError::NotFound(_)) => {
                debug!(user_id, "No stored profile");
                None
            }
            Err(e) => {
                warn!(user_id, error = %e, "Profile store unavailable, continuing without profile");
                None
            }
        }
    }
}

#[async_trait]
impl Stage for PatientDataStage {
    fn name(&self) -> &'static str {
        "patient_data"
    }

    async fn run(&self, state: &TurnState) -> TurnUpdate {
        let mut update = TurnUpdate::default();
        let text = state.user_text();

        let profile = match &state.profile {
            Some(profile) => Some(profile.clone()),
            None => {
                let fetched = self.hydrate(&state.user_id).await;
                update.profile = fetched.clone();
                fetched
            }
        };

        if is_profile_request(text) {
            update.data_response = Some(match &profile {
                Some(p) => p.format_block(phase_label(p).as_deref()),
                None => NO_PROFILE.to_string(),
            });
            return update;
        }

        let resolution = self
            .resolver
            .resolve(&state.user_id, text, state.prior_assistant_text())
            .await;
        update.intent = Some(resolution.intent);

        if resolution.outcome != LoggingOutcome::NotAttempted {
            update.macro_tier = resolution.tier();
            update.data_response = resolution.outcome.note();
            update.nutrition_facts = resolution.facts;
            if resolution.profile.is_some() {
                update.profile = resolution.profile;
            }
            update.logging = Some(resolution.outcome);
            return update;
        }

        if state.patient_id.is_some() {
            if let Some(p) = &profile {
                update.data_response = Some(patient_note(p));
            }
        }
        update
    }
}

/// Compact context about the patient for the synthesizer.
fn patient_note(profile: &PatientProfile) -> String {
    let mut parts = Vec::new();
    if let Some(phase) = phase_label(profile) {
        parts.push(format!("Current phase: {phase}"));
    }
    if let Some(diet) = &profile.diet_type {
        parts.push(format!("Diet type: {diet}"));
    }
    if let Some(activity) = &profile.activity_level {
        parts.push(format!("Activity level: {activity}"));
    }
    parts.push(format!(
        "Protein so far today: {}g",
        profile.protein_today.round() as i64
    ));
    format!("Patient context. {}.", parts.join(". "))
}

#[cfg(test)]
mod tests {
    use bariatric_core::profile::MealEntry;
    use bariatric_tools::InMemoryProfileStore;

    use super::*;
    use crate::state::{MacroTier, MealIntent};
    use crate::test_helpers::RecordingRecorder;

    fn stage(recorder: Arc<RecordingRecorder>) -> PatientDataStage {
        PatientDataStage::new(MealLoggingResolver::new(recorder))
    }

    #[test]
    fn recognizes_profile_requests() {
        assert!(is_profile_request("Show me my profile"));
        assert!(is_profile_request("can you show my data please"));
        assert!(is_profile_request("What have I eaten today?"));
        assert!(is_profile_request("what's my profile"));
        assert!(!is_profile_request("Show me a high protein breakfast"));
        assert!(!is_profile_request("I had eggs"));
    }

    #[tokio::test]
    async fn profile_request_skips_logging() {
        let recorder = Arc::new(RecordingRecorder::default());
        let mut state = TurnState::new("7", "show my data");
        let mut profile = PatientProfile::default();
        profile.record_meal(MealEntry::clamped("eggs", 12.0, 140.0));
        state.profile = Some(profile);

        let update = stage(recorder.clone()).run(&state).await;

        let block = update.data_response.unwrap();
        assert!(block.contains("eggs (12g protein, 140 kcal)"));
        assert!(update.logging.is_none());
        assert!(update.intent.is_none());
    }

    #[tokio::test]
    async fn profile_request_without_profile() {
        let update = stage(Arc::new(RecordingRecorder::default()))
            .run(&TurnState::new("7", "show my profile"))
            .await;
        assert_eq!(update.data_response.as_deref(), Some(NO_PROFILE));
    }

    #[tokio::test]
    async fn logging_outcome_becomes_data_note() {
        let recorder = Arc::new(RecordingRecorder::default());
        let state = TurnState::new("7", "I had a protein shake, 30g protein, 200 calories");

        let update = stage(recorder).run(&state).await;

        assert_eq!(update.intent, Some(MealIntent::Eating));
        assert_eq!(update.macro_tier, Some(MacroTier::Stated));
        assert!(update.logging.as_ref().unwrap().is_logged());
        assert!(update.data_response.unwrap().contains("protein shake"));
        assert_eq!(update.profile.unwrap().protein_today, 30.0);
    }

    #[tokio::test]
    async fn hydrates_profile_from_store() {
        let store = Arc::new(InMemoryProfileStore::default());
        store
            .insert(
                "7",
                PatientProfile {
                    diet_type: Some("vegetarian".into()),
                    ..Default::default()
                },
            )
            .await;
        let mut state = TurnState::new("7", "What are good snacks for week four?");
        state.patient_id = Some("p-7".into());

        let update = stage(Arc::new(RecordingRecorder::default()))
            .with_profile_store(store)
            .run(&state)
            .await;

        assert_eq!(
            update.profile.unwrap().diet_type.as_deref(),
            Some("vegetarian")
        );
        let note = update.data_response.unwrap();
        assert!(note.contains("Diet type: vegetarian"));
        assert!(note.contains("Protein so far today: 0g"));
    }

    #[tokio::test]
    async fn no_patient_id_no_note() {
        let mut state = TurnState::new("7", "What are good snacks for week four?");
        state.profile = Some(PatientProfile::default());
        let update = stage(Arc::new(RecordingRecorder::default())).run(&state).await;
        assert!(update.data_response.is_none());
        assert_eq!(update.intent, Some(MealIntent::None));
    }
}
