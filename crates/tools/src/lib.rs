//! External collaborator adapters for Bariatric GPT.
//!
//! The pipeline talks to the outside world through the traits in
//! `bariatric-core`; this crate supplies the concrete backends:
//! the Open Food Facts nutrition lookup, the profile store (HTTP or
//! in-process), and meal recording on top of the profile store.

pub mod meal_recorder;
pub mod nutrition_lookup;
pub mod profile_store;

pub use meal_recorder::ProfileMealRecorder;
pub use nutrition_lookup::OpenFoodFactsLookup;
pub use profile_store::{HttpProfileStore, InMemoryProfileStore};
