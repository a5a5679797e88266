//! Shared test fakes for the pipeline stages.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bariatric_core::error::{KnowledgeError, NutritionError, ProfileStoreError, ProviderError};
use bariatric_core::knowledge::KnowledgeIndex;
use bariatric_core::message::Message;
use bariatric_core::nutrition::{NutritionFacts, NutritionLookup};
use bariatric_core::profile::{MealEntry, MealRecorder, PatientProfile};
use bariatric_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

/// A provider that returns scripted completions in order.
///
/// Once the script runs out, the last completion repeats. A failing
/// provider errors on every call.
pub struct ScriptedProvider {
    responses: Vec<String>,
    fail: bool,
    call_count: Mutex<usize>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            fail: false,
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::<String>::new())
        }
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// System prompts of every request, in call order.
    pub fn system_prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.messages.first().map(|m| m.content.clone()))
            .collect()
    }

    /// The system prompt of the most recent request.
    pub fn last_system_prompt(&self) -> Option<String> {
        self.last_request()
            .and_then(|r| r.messages.first().map(|m| m.content.clone()))
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        self.requests.lock().unwrap().push(request);

        if self.fail {
            return Err(ProviderError::Network("connection refused".into()));
        }

        let text = self
            .responses
            .get(*count - 1)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or_default();

        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}

/// Knowledge index returning fixed passages, or failing.
pub struct FixedIndex {
    pub passages: Vec<String>,
    pub fail: bool,
    pub queries: Mutex<usize>,
}

impl FixedIndex {
    pub fn new<I, S>(passages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passages: passages.into_iter().map(Into::into).collect(),
            fail: false,
            queries: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::<String>::new())
        }
    }

    pub fn query_count(&self) -> usize {
        *self.queries.lock().unwrap()
    }
}

#[async_trait]
impl KnowledgeIndex for FixedIndex {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn query(&self, _text: &str, k: usize) -> Result<Vec<String>, KnowledgeError> {
        *self.queries.lock().unwrap() += 1;
        if self.fail {
            return Err(KnowledgeError::Unavailable("index offline".into()));
        }
        Ok(self.passages.iter().take(k).cloned().collect())
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.passages.len())
    }
}

/// Nutrition lookup backed by a map; unknown foods are `NotFound`.
#[derive(Default)]
pub struct FakeNutrition {
    pub foods: HashMap<String, NutritionFacts>,
    pub lookups: Mutex<Vec<String>>,
}

impl FakeNutrition {
    pub fn with(mut self, food: &str, protein: f64, calories: f64) -> Self {
        self.foods.insert(
            food.to_string(),
            NutritionFacts {
                name: food.to_string(),
                serving_size: "1 serving".into(),
                calories: Some(calories),
                protein_g: Some(protein),
                carbs_g: None,
                fat_g: None,
            },
        );
        self
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().unwrap().len()
    }
}

#[async_trait]
impl NutritionLookup for FakeNutrition {
    fn name(&self) -> &str {
        "fake"
    }

    async fn lookup(&self, food_name: &str) -> Result<NutritionFacts, NutritionError> {
        self.lookups.lock().unwrap().push(food_name.to_string());
        self.foods
            .get(food_name)
            .cloned()
            .ok_or_else(|| NutritionError::NotFound(food_name.to_string()))
    }
}

/// Meal recorder that keeps profiles in a map, or fails every write.
#[derive(Default)]
pub struct RecordingRecorder {
    pub profiles: Mutex<HashMap<String, PatientProfile>>,
    pub fail: bool,
}

impl RecordingRecorder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn meals(&self, user_id: &str) -> Vec<MealEntry> {
        self.profiles
            .lock()
            .unwrap()
            .get(user_id)
            .map(|p| p.todays_meals.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MealRecorder for RecordingRecorder {
    async fn record(
        &self,
        user_id: &str,
        meal: &MealEntry,
    ) -> Result<PatientProfile, ProfileStoreError> {
        if self.fail {
            return Err(ProfileStoreError::Network("profile store unreachable".into()));
        }
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.entry(user_id.to_string()).or_default();
        profile.record_meal(meal.clone());
        Ok(profile.clone())
    }
}
