//! Pipeline Controller: Research → Patient-Data/Logging → Nutrition →
//! Synthesis, threading one `TurnState` through each stage.

use std::sync::Arc;

use bariatric_config::AppConfig;
use bariatric_core::knowledge::KnowledgeIndex;
use bariatric_core::nutrition::NutritionLookup;
use bariatric_core::profile::{MealRecorder, PatientProfile, ProfileStore};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::background::BackgroundTask;
use crate::conversation_log::ConversationLog;
use crate::llm::LanguageModel;
use crate::meal_logging::MealLoggingResolver;
use crate::memory_summarizer::{MemoryJob, MemorySummarizer};
use crate::stages::synthesizer::{APOLOGY, SynthesisSettings, to_markdown};
use crate::stages::{NutritionStage, PatientDataStage, Retriever, Stage, Synthesizer};
use crate::state::TurnState;

/// One inbound turn.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TurnRequest {
    pub message: String,

    #[serde(default = "default_user_id", alias = "userId")]
    pub user_id: String,

    #[serde(default, alias = "patientId")]
    pub patient_id: Option<String>,

    #[serde(default)]
    pub profile: Option<PatientProfile>,

    /// Prior memory summary, advisory only. When absent the stored
    /// summary is read back.
    #[serde(default)]
    pub memory: Option<String>,

    /// Rolling window, as a JSON object or a string holding one
    #[serde(default, alias = "conversationLog")]
    pub conversation_log: Option<Value>,

    #[serde(default)]
    pub debug: bool,
}

/// User id for requests that name none. Anonymous turns keep no memory.
pub const ANONYMOUS_USER: &str = "anonymous";

fn default_user_id() -> String {
    ANONYMOUS_USER.into()
}

impl TurnRequest {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            user_id: user_id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub response: String,
    pub response_markdown: String,
    pub response_text: String,

    /// The memory the request carried; updates happen in the background
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,

    /// Serialized rolling window to send back next turn
    pub conversation_log: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
}

/// A finished turn plus the detached memory update, if one was started.
pub struct TurnOutcome {
    pub response: TurnResponse,
    pub background: Option<BackgroundTask>,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub top_k: usize,
    pub min_query_chars: usize,
    pub synthesis: SynthesisSettings,
    pub llm_intent_fallback: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_query_chars: 8,
            synthesis: SynthesisSettings::default(),
            llm_intent_fallback: true,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            top_k: config.knowledge.top_k,
            min_query_chars: config.knowledge.min_query_chars,
            synthesis: SynthesisSettings {
                max_sentences: config.synthesis.max_sentences,
                max_words: config.synthesis.max_words,
                max_context_chars: config.knowledge.max_context_chars,
            },
            llm_intent_fallback: config.meal_logging.llm_intent_fallback,
        }
    }
}

/// Collaborators and settings for a `Pipeline`.
pub struct PipelineBuilder {
    llm: LanguageModel,
    index: Arc<dyn KnowledgeIndex>,
    recorder: Arc<dyn MealRecorder>,
    nutrition: Option<Arc<dyn NutritionLookup>>,
    profile_store: Option<Arc<dyn ProfileStore>>,
    memory: Option<Arc<MemorySummarizer>>,
    settings: PipelineSettings,
}

impl PipelineBuilder {
    pub fn with_nutrition(mut self, nutrition: Arc<dyn NutritionLookup>) -> Self {
        self.nutrition = Some(nutrition);
        self
    }

    pub fn with_profile_store(mut self, store: Arc<dyn ProfileStore>) -> Self {
        self.profile_store = Some(store);
        self
    }

    pub fn with_memory(mut self, summarizer: Arc<MemorySummarizer>) -> Self {
        self.memory = Some(summarizer);
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Pipeline {
        let mut resolver = MealLoggingResolver::new(self.recorder);
        if let Some(nutrition) = &self.nutrition {
            resolver = resolver.with_nutrition(nutrition.clone());
        }
        if self.settings.llm_intent_fallback {
            resolver = resolver.with_intent_fallback(self.llm.clone());
        }

        let mut patient_data = PatientDataStage::new(resolver);
        if let Some(store) = self.profile_store {
            patient_data = patient_data.with_profile_store(store);
        }

        Pipeline {
            retriever: Retriever::new(self.index)
                .with_top_k(self.settings.top_k)
                .with_min_query_chars(self.settings.min_query_chars),
            patient_data,
            nutrition: NutritionStage::new(self.nutrition),
            synthesizer: Synthesizer::new(self.llm).with_settings(self.settings.synthesis),
            memory: self.memory,
        }
    }
}

pub struct Pipeline {
    retriever: Retriever,
    patient_data: PatientDataStage,
    nutrition: NutritionStage,
    synthesizer: Synthesizer,
    memory: Option<Arc<MemorySummarizer>>,
}

impl Pipeline {
    pub fn builder(
        llm: LanguageModel,
        index: Arc<dyn KnowledgeIndex>,
        recorder: Arc<dyn MealRecorder>,
    ) -> PipelineBuilder {
        PipelineBuilder {
            llm,
            index,
            recorder,
            nutrition: None,
            profile_store: None,
            memory: None,
            settings: PipelineSettings::default(),
        }
    }

    /// Run one turn through every stage. Always produces a response.
    pub async fn run_turn(&self, request: TurnRequest) -> TurnOutcome {
        let summarizer = self
            .memory
            .as_ref()
            .filter(|_| request.user_id != ANONYMOUS_USER);
        let memory = match (&request.memory, summarizer) {
            (Some(memory), _) => Some(memory.clone()),
            (None, Some(summarizer)) => summarizer.recall(&request.user_id).await,
            (None, None) => None,
        };

        let mut state = TurnState::new(request.user_id.clone(), request.message.clone());
        state.patient_id = request.patient_id.clone();
        state.profile = request.profile.clone();
        state.memory_summary = memory.clone();
        state.conversation_log = request
            .conversation_log
            .as_ref()
            .map(ConversationLog::from_value)
            .unwrap_or_default();

        info!(
            user_id = %state.user_id,
            log_len = state.conversation_log.len(),
            "Turn started"
        );

        let stages: [&dyn Stage; 4] = [
            &self.retriever,
            &self.patient_data,
            &self.nutrition,
            &self.synthesizer,
        ];
        for stage in stages {
            let update = stage.run(&state).await;
            debug!(stage = stage.name(), "Stage finished");
            state.merge(update);
        }

        let answer = state
            .final_response
            .clone()
            .unwrap_or_else(|| APOLOGY.to_string());
        let markdown = state
            .final_response_formatted
            .clone()
            .unwrap_or_else(|| to_markdown(&answer));

        // exactly one append per turn
        let mut log = state.conversation_log.clone();
        log.push(request.message.clone(), answer.clone());

        let background = summarizer.map(|summarizer| {
            summarizer.clone().spawn(MemoryJob {
                user_id: request.user_id.clone(),
                previous: memory.clone(),
                user_text: request.message.clone(),
                assistant_text: answer.clone(),
            })
        });

        let debug = request.debug.then(|| debug_payload(&state));

        info!(
            user_id = %state.user_id,
            short_circuit = ?state.trace.short_circuit,
            logged = state.logging.is_logged(),
            "Turn finished"
        );

        TurnOutcome {
            response: TurnResponse {
                response: answer.clone(),
                response_markdown: markdown,
                response_text: answer,
                memory: request.memory,
                conversation_log: log.to_json(),
                debug,
            },
            background,
        }
    }

    /// Run a turn and detach any background work.
    pub async fn handle(&self, request: TurnRequest) -> TurnResponse {
        self.run_turn(request).await.response
    }
}

fn debug_payload(state: &TurnState) -> Value {
    json!({
        "clinical_context": state.clinical_context,
        "data_response": state.data_response,
        "nutrition_context": state.nutrition_context,
        "intent": state.trace.intent,
        "macro_tier": state.trace.macro_tier,
        "short_circuit": state.trace.short_circuit,
        "completion_error": state.trace.completion_error,
    })
}
