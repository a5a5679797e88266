//! Error types for the Bariatric GPT domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external collaborator has its own error enum; the pipeline turns
//! all of them into "no contribution" rather than surfacing them to users.

use thiserror::Error;

/// The top-level error type for all Bariatric GPT operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Language model errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Knowledge index errors ---
    #[error("Knowledge error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Food database errors ---
    #[error("Nutrition error: {0}")]
    Nutrition(#[from] NutritionError),

    // --- Profile store errors ---
    #[error("Profile store error: {0}")]
    ProfileStore(#[from] ProfileStoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum KnowledgeError {
    #[error("Index unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum NutritionError {
    #[error("No nutrition data found for '{0}'")]
    NotFound(String),

    #[error("Food database returned status {status_code}")]
    ApiError { status_code: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid food database response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProfileStoreError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Profile store returned status {status_code}: {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid profile payload: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn nutrition_not_found_names_food() {
        let err = Error::Nutrition(NutritionError::NotFound("greek yogurt".into()));
        assert!(err.to_string().contains("greek yogurt"));
    }

    #[test]
    fn profile_store_error_carries_status() {
        let err = ProfileStoreError::ApiError {
            status_code: 503,
            message: "unavailable".into(),
        };
        assert!(err.to_string().contains("503"));
    }
}
