//! LLM Provider implementations for Bariatric GPT.
//!
//! All providers implement the `bariatric_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
