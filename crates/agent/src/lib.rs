//! The Bariatric GPT conversational pipeline.
//!
//! One user turn flows through a fixed chain of stages:
//!
//! 1. **Research**: retrieve clinical reference passages
//! 2. **Patient data**: hydrate the profile, resolve meal logging
//! 3. **Nutrition**: attach verified macros when a food is asked about
//! 4. **Synthesis**: answer, short-circuiting the model where possible
//!
//! Each stage returns a partial update merged into a single `TurnState`.
//! After the response is built, the rolling conversation log is appended
//! once and the memory summary is updated in the background.

pub mod background;
pub mod builder;
pub mod conversation_log;
pub mod llm;
pub mod meal_logging;
pub mod memory_summarizer;
pub mod phase;
pub mod pipeline;
pub mod stages;
pub mod state;
pub mod text;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use background::BackgroundTask;
pub use builder::build_pipeline;
pub use conversation_log::ConversationLog;
pub use llm::LanguageModel;
pub use meal_logging::{MealLoggingResolver, Resolution};
pub use memory_summarizer::{MemoryJob, MemorySummarizer};
pub use phase::PhaseOfCare;
pub use pipeline::{
    ANONYMOUS_USER, Pipeline, PipelineBuilder, PipelineSettings, TurnOutcome, TurnRequest,
    TurnResponse,
};
pub use state::{LoggingOutcome, MacroTier, MealIntent, TurnState, TurnUpdate};
