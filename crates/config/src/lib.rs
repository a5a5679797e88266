//! Configuration loading, validation, and management for Bariatric GPT.
//!
//! Loads configuration from `~/.bariatric/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.bariatric/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Knowledge retrieval configuration
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Food database configuration
    #[serde(default)]
    pub nutrition: NutritionConfig,

    /// Profile store configuration
    #[serde(default)]
    pub profile_store: ProfileStoreConfig,

    /// Response synthesis limits
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Background memory summarization
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Meal logging behaviour
    #[serde(default)]
    pub meal_logging: MealLoggingConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "llama3.2:3b".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("gateway", &self.gateway)
            .field("knowledge", &self.knowledge)
            .field("nutrition", &self.nutrition)
            .field("profile_store", &self.profile_store)
            .field("synthesis", &self.synthesis)
            .field("memory", &self.memory)
            .field("meal_logging", &self.meal_logging)
            .field("providers", &self.providers)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8001
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// JSONL passage file produced by the offline build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_path: Option<String>,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Queries shorter than this are not sent to the index
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,

    /// Hard cap on the clinical excerpt placed in the prompt
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Embedding model; enables vector search when passages carry embeddings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

fn default_top_k() -> usize {
    5
}
fn default_min_query_chars() -> usize {
    8
}
fn default_max_context_chars() -> usize {
    1500
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            index_path: None,
            top_k: default_top_k(),
            min_query_chars: default_min_query_chars(),
            max_context_chars: default_max_context_chars(),
            embedding_model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_nutrition_url")]
    pub api_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_nutrition_url() -> String {
    "https://world.openfoodfacts.org/cgi/search.pl".into()
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_nutrition_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileStoreConfig {
    /// Base URL of the profile service; unset = in-process store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProfileStoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_max_sentences")]
    pub max_sentences: usize,

    /// Soft cap: the reply ends at the first sentence boundary past this count
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

fn default_max_sentences() -> usize {
    6
}
fn default_max_words() -> usize {
    160
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_sentences: default_max_sentences(),
            max_words: default_max_words(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Store key used when a user id has no numeric component
    #[serde(default = "default_fallback_user_id")]
    pub fallback_user_id: String,
}

fn default_fallback_user_id() -> String {
    "1".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fallback_user_id: default_fallback_user_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealLoggingConfig {
    /// Ask the language model to classify turns the rule table cannot decide
    #[serde(default = "default_true")]
    pub llm_intent_fallback: bool,
}

impl Default for MealLoggingConfig {
    fn default() -> Self {
        Self {
            llm_intent_fallback: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.bariatric/config.toml).
    ///
    /// Also checks environment variables:
    /// - `BARIATRIC_API_KEY` (highest priority), `OPENROUTER_API_KEY`, `OPENAI_API_KEY`
    /// - `BARIATRIC_PROVIDER`, `BARIATRIC_MODEL`
    /// - `BARIATRIC_PROFILE_STORE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("BARIATRIC_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("BARIATRIC_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("BARIATRIC_MODEL") {
            config.default_model = model;
        }

        if let Ok(url) = std::env::var("BARIATRIC_PROFILE_STORE_URL") {
            config.profile_store.url = Some(url);
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".bariatric")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.knowledge.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.top_k must be > 0".into(),
            ));
        }

        if self.synthesis.max_sentences == 0 || self.synthesis.max_words == 0 {
            return Err(ConfigError::ValidationError(
                "synthesis.max_sentences and synthesis.max_words must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            gateway: GatewayConfig::default(),
            knowledge: KnowledgeConfig::default(),
            nutrition: NutritionConfig::default(),
            profile_store: ProfileStoreConfig::default(),
            synthesis: SynthesisConfig::default(),
            memory: MemoryConfig::default(),
            meal_logging: MealLoggingConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "ollama");
        assert_eq!(config.gateway.port, 8001);
        assert_eq!(config.knowledge.top_k, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.synthesis.max_words, config.synthesis.max_words);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_top_k_rejected() {
        let mut config = AppConfig::default();
        config.knowledge.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_model, "llama3.2:3b");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_model = "deepseek-r1:8b"

[profile_store]
url = "http://localhost:8002"

[synthesis]
max_sentences = 4
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_model, "deepseek-r1:8b");
        assert_eq!(config.profile_store.url.as_deref(), Some("http://localhost:8002"));
        assert_eq!(config.synthesis.max_sentences, 4);
        assert_eq!(config.synthesis.max_words, 160);
        assert!(config.nutrition.enabled);
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_temperature = \"hot\"").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("ollama"));
        assert!(toml_str.contains("8001"));
    }
}
