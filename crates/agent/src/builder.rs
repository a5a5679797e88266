//! Wire a `Pipeline` from `AppConfig`.

use std::sync::Arc;
use std::time::Duration;

use bariatric_config::AppConfig;
use bariatric_core::error::Error;
use bariatric_core::knowledge::KnowledgeIndex;
use bariatric_core::profile::ProfileStore;
use bariatric_core::provider::Provider;
use bariatric_knowledge::{FileIndex, NoopIndex};
use bariatric_providers::build_from_config;
use bariatric_tools::{HttpProfileStore, InMemoryProfileStore, OpenFoodFactsLookup, ProfileMealRecorder};
use tracing::{info, warn};

use crate::llm::LanguageModel;
use crate::memory_summarizer::MemorySummarizer;
use crate::pipeline::{Pipeline, PipelineSettings};

/// The configured default provider.
pub fn default_provider(config: &AppConfig) -> Result<Arc<dyn Provider>, Error> {
    build_from_config(config)
        .default()
        .ok_or_else(|| Error::Config {
            message: format!("provider '{}' is not available", config.default_provider),
        })
}

/// The knowledge index named in config, or a no-op index when none is
/// configured or the file cannot be read.
pub fn knowledge_index(config: &AppConfig, provider: Arc<dyn Provider>) -> Arc<dyn KnowledgeIndex> {
    let Some(path) = &config.knowledge.index_path else {
        info!("No knowledge index configured, retrieval disabled");
        return Arc::new(NoopIndex);
    };
    match FileIndex::open(path) {
        Ok(index) => {
            let index = match &config.knowledge.embedding_model {
                Some(model) => index.with_embedder(provider, model.clone()),
                None => index,
            };
            Arc::new(index)
        }
        Err(e) => {
            warn!(path = %path, error = %e, "Knowledge index unavailable, retrieval disabled");
            Arc::new(NoopIndex)
        }
    }
}

/// The HTTP profile store when a URL is configured, else an in-process one.
pub fn profile_store(config: &AppConfig) -> Arc<dyn ProfileStore> {
    match &config.profile_store.url {
        Some(url) => Arc::new(HttpProfileStore::new(
            url.clone(),
            Duration::from_secs(config.profile_store.timeout_secs),
        )),
        None => {
            info!("No profile store URL configured, using in-process store");
            Arc::new(InMemoryProfileStore::default())
        }
    }
}

/// Build the full pipeline from configuration.
pub fn build_pipeline(config: &AppConfig) -> Result<Pipeline, Error> {
    let provider = default_provider(config)?;
    let llm = LanguageModel::new(provider.clone(), config.default_model.clone())
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens);

    let index = knowledge_index(config, provider);
    let store = profile_store(config);
    let recorder = Arc::new(ProfileMealRecorder::new(store.clone()));

    let mut builder = Pipeline::builder(llm.clone(), index, recorder)
        .with_profile_store(store.clone())
        .with_settings(PipelineSettings::from_config(config));

    if config.nutrition.enabled {
        builder = builder.with_nutrition(Arc::new(OpenFoodFactsLookup::new(
            config.nutrition.api_url.clone(),
            Duration::from_secs(config.nutrition.timeout_secs),
        )));
    }
    if config.memory.enabled {
        builder = builder.with_memory(Arc::new(MemorySummarizer::new(
            llm,
            store,
            config.memory.fallback_user_id.clone(),
        )));
    }

    info!(
        provider = %config.default_provider,
        model = %config.default_model,
        nutrition = config.nutrition.enabled,
        memory = config.memory.enabled,
        "Pipeline ready"
    );
    Ok(builder.build())
}
