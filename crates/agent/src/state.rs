//! Per-turn state and the additive update each stage returns.
//!
//! A `TurnState` lives for exactly one turn. Stages never mutate it
//! directly: each returns a `TurnUpdate` and the pipeline merges it in.
//! Context fields (`clinical_context`, `data_response`,
//! `nutrition_context`) attach once; a second attach is ignored.

use bariatric_core::message::{Message, Role, last_with_role};
use bariatric_core::nutrition::NutritionFacts;
use bariatric_core::profile::{MealEntry, PatientProfile};
use serde::Serialize;
use tracing::warn;

use crate::conversation_log::ConversationLog;

/// What the meal-logging rule table (or its fallback) decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MealIntent {
    /// "log that", or a bare affirmation after a proposed meal
    Referential,
    /// First-person consumption: "I had a protein shake"
    Eating,
    /// Explicit directive naming the food: "log my breakfast of eggs"
    Recording,
    None,
}

/// Where the logged macros came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroTier {
    Stated,
    Lookup,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoggingFailure {
    /// No meal name could be extracted, so nothing can be verified.
    Unverifiable,
    /// Referential intent, but the prior assistant turn proposed no meal.
    NoReferent,
    /// The meal recorder rejected the write.
    Downstream(String),
}

/// Exactly one of these holds per turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoggingOutcome {
    #[default]
    NotAttempted,
    Logged {
        meal: MealEntry,
        tier: MacroTier,
        protein_today: f64,
    },
    Failed(LoggingFailure),
}

impl LoggingOutcome {
    /// The note handed to the synthesizer, if logging was attempted.
    pub fn note(&self) -> Option<String> {
        match self {
            Self::NotAttempted => None,
            Self::Logged {
                meal,
                protein_today,
                ..
            } => Some(format!(
                "Meal logged successfully: {}. Protein so far today: {}g.",
                meal.summary(),
                protein_today.round() as i64
            )),
            Self::Failed(LoggingFailure::Unverifiable) => Some(
                "I couldn't log that meal because no macros could be verified. \
                 Please tell me what you ate along with the grams of protein and calories, \
                 and I'll record it."
                    .into(),
            ),
            Self::Failed(LoggingFailure::NoReferent) => Some(
                "I couldn't tell which meal you meant, so nothing was logged. \
                 Please name the food with its grams of protein and calories."
                    .into(),
            ),
            Self::Failed(LoggingFailure::Downstream(reason)) => Some(format!(
                "Meal logging failed: {reason}. Nothing was saved; please try again in a moment."
            )),
        }
    }

    pub fn is_logged(&self) -> bool {
        matches!(self, Self::Logged { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Why the synthesizer answered without calling the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortCircuit {
    MealLogged,
    LoggingFailed,
    ProfileRequest,
    Greeting,
}

/// Stage decisions recorded for debug output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<MealIntent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macro_tier: Option<MacroTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_circuit: Option<ShortCircuit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_error: Option<String>,
}

/// Everything known about the turn in flight.
#[derive(Debug, Clone)]
pub struct TurnState {
    pub messages: Vec<Message>,
    pub user_id: String,
    pub patient_id: Option<String>,
    pub profile: Option<PatientProfile>,
    pub conversation_log: ConversationLog,
    pub memory_summary: Option<String>,
    pub clinical_context: Option<String>,
    pub data_response: Option<String>,
    pub nutrition_context: Option<String>,
    /// Facts fetched while resolving macros, reused by the nutrition stage
    pub nutrition_facts: Option<NutritionFacts>,
    pub logging: LoggingOutcome,
    pub final_response: Option<String>,
    pub final_response_formatted: Option<String>,
    pub trace: StageTrace,
}

impl TurnState {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(message)],
            user_id: user_id.into(),
            patient_id: None,
            profile: None,
            conversation_log: ConversationLog::default(),
            memory_summary: None,
            clinical_context: None,
            data_response: None,
            nutrition_context: None,
            nutrition_facts: None,
            logging: LoggingOutcome::NotAttempted,
            final_response: None,
            final_response_formatted: None,
            trace: StageTrace::default(),
        }
    }

    /// The user's message for this turn.
    pub fn user_text(&self) -> &str {
        last_with_role(&self.messages, Role::User).unwrap_or_default()
    }

    /// The assistant's previous reply: the rolling log first, then any
    /// assistant message carried in `messages`.
    pub fn prior_assistant_text(&self) -> Option<&str> {
        self.conversation_log
            .last_assistant()
            .or_else(|| last_with_role(&self.messages, Role::Assistant))
    }

    /// Merge a stage's partial update into the state.
    pub fn merge(&mut self, update: TurnUpdate) {
        attach_once(&mut self.clinical_context, update.clinical_context, "clinical_context");
        attach_once(&mut self.data_response, update.data_response, "data_response");
        attach_once(
            &mut self.nutrition_context,
            update.nutrition_context,
            "nutrition_context",
        );
        attach_once(&mut self.nutrition_facts, update.nutrition_facts, "nutrition_facts");

        if let Some(profile) = update.profile {
            self.profile = Some(profile);
        }

        if let Some(outcome) = update.logging {
            if matches!(self.logging, LoggingOutcome::NotAttempted) {
                self.logging = outcome;
            } else {
                warn!("Ignoring second meal-logging outcome for this turn");
            }
        }

        if let Some(intent) = update.intent {
            self.trace.intent = Some(intent);
        }
        if let Some(tier) = update.macro_tier {
            self.trace.macro_tier = Some(tier);
        }
        if let Some(reason) = update.short_circuit {
            self.trace.short_circuit = Some(reason);
        }
        if let Some(err) = update.completion_error {
            self.trace.completion_error = Some(err);
        }

        if let Some(text) = update.final_response {
            self.messages.push(Message::assistant(text.clone()));
            self.final_response = Some(text);
        }
        if let Some(formatted) = update.final_response_formatted {
            self.final_response_formatted = Some(formatted);
        }
    }
}

fn attach_once<T>(slot: &mut Option<T>, value: Option<T>, field: &str) {
    if let Some(value) = value {
        if slot.is_none() {
            *slot = Some(value);
        } else {
            warn!(field, "Field already attached this turn, keeping first value");
        }
    }
}

/// A stage's contribution. Unset fields leave the state untouched.
#[derive(Debug, Clone, Default)]
pub struct TurnUpdate {
    pub clinical_context: Option<String>,
    pub data_response: Option<String>,
    pub nutrition_context: Option<String>,
    pub nutrition_facts: Option<NutritionFacts>,
    pub profile: Option<PatientProfile>,
    pub logging: Option<LoggingOutcome>,
    pub intent: Option<MealIntent>,
    pub macro_tier: Option<MacroTier>,
    pub short_circuit: Option<ShortCircuit>,
    pub completion_error: Option<String>,
    pub final_response: Option<String>,
    pub final_response_formatted: Option<String>,
}
