//! # Bariatric Core
//!
//! Domain types, collaborator traits, and error definitions for the
//! Bariatric GPT post-surgery nutrition assistant. This crate performs no
//! I/O of its own; it defines the model every other crate implements
//! against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (language model, knowledge index, food
//! database, profile store) is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Testing the pipeline end to end with fakes
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod knowledge;
pub mod message;
pub mod nutrition;
pub mod profile;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use knowledge::KnowledgeIndex;
pub use message::{Message, Role};
pub use nutrition::{NutritionFacts, NutritionLookup};
pub use profile::{MealEntry, MealRecorder, PatientProfile, ProfileStore};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
