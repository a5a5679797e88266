//! Pipeline stages.
//!
//! Each stage reads the turn state and returns a `TurnUpdate`. Stages never
//! fail: a collaborator error becomes an empty update.

pub mod nutrition;
pub mod patient_data;
pub mod retriever;
pub mod synthesizer;

use async_trait::async_trait;

use crate::state::{TurnState, TurnUpdate};

pub use nutrition::NutritionStage;
pub use patient_data::PatientDataStage;
pub use retriever::Retriever;
pub use synthesizer::Synthesizer;

/// One step of the fixed pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name for logs and traces.
    fn name(&self) -> &'static str;

    /// Read the state, return only the fields this stage owns.
    async fn run(&self, state: &TurnState) -> TurnUpdate;
}
