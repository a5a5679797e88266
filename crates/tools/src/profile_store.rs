//! Profile store backends.
//!
//! - `HttpProfileStore` talks to the storage service:
//!   `GET /profile/{id}`, `PUT /profile/{id}`, `GET /memory/{id}`,
//!   `PUT /memory/{id}`.
//! - `InMemoryProfileStore` keeps everything in a map, for tests and
//!   single-process runs.
//!
//! Both are whole-document stores: a `put_profile` replaces the profile.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bariatric_core::error::ProfileStoreError;
use bariatric_core::profile::{PatientProfile, ProfileStore};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

/// HTTP client for the profile storage service.
pub struct HttpProfileStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpProfileStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn check(
        user_id: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProfileStoreError> {
        let status = response.status().as_u16();
        match status {
            200..=299 => Ok(response),
            404 => Err(ProfileStoreError::NotFound(user_id.to_string())),
            _ => Err(ProfileStoreError::ApiError {
                status_code: status,
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

/// The service may return the profile bare or wrapped as `{"profile": {...}}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileBody {
    Wrapped { profile: PatientProfile },
    Bare(PatientProfile),
}

/// Memory comes back as `{"memory": "..."}` or as a bare JSON string.
#[derive(Deserialize)]
#[serde(untagged)]
enum MemoryBody {
    Wrapped { memory: Option<String> },
    Bare(String),
}

#[async_trait]
impl ProfileStore for HttpProfileStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn get_profile(&self, user_id: &str) -> Result<PatientProfile, ProfileStoreError> {
        let url = format!("{}/profile/{user_id}", self.base_url);
        debug!(%url, "Fetching profile");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProfileStoreError::Network(e.to_string()))?;
        let response = Self::check(user_id, response).await?;
        let body: ProfileBody = response
            .json()
            .await
            .map_err(|e| ProfileStoreError::Serialization(e.to_string()))?;
        Ok(match body {
            ProfileBody::Wrapped { profile } | ProfileBody::Bare(profile) => profile,
        })
    }

    async fn put_profile(
        &self,
        user_id: &str,
        profile: &PatientProfile,
    ) -> Result<(), ProfileStoreError> {
        let url = format!("{}/profile/{user_id}", self.base_url);
        let response = self
            .client
            .put(&url)
            .json(profile)
            .send()
            .await
            .map_err(|e| ProfileStoreError::Network(e.to_string()))?;
        Self::check(user_id, response).await?;
        Ok(())
    }

    async fn get_memory(&self, user_id: &str) -> Result<Option<String>, ProfileStoreError> {
        let url = format!("{}/memory/{user_id}", self.base_url);
        debug!(%url, "Fetching memory");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProfileStoreError::Network(e.to_string()))?;
        let response = match Self::check(user_id, response).await {
            Ok(response) => response,
            Err(ProfileStoreError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let body: MemoryBody = response
            .json()
            .await
            .map_err(|e| ProfileStoreError::Serialization(e.to_string()))?;
        let memory = match body {
            MemoryBody::Wrapped { memory } => memory,
            MemoryBody::Bare(memory) => Some(memory),
        };
        Ok(memory.filter(|m| !m.trim().is_empty()))
    }

    async fn put_memory(&self, user_id: &str, memory: &str) -> Result<(), ProfileStoreError> {
        let url = format!("{}/memory/{user_id}", self.base_url);
        let response = self
            .client
            .put(&url)
            .json(&serde_json::json!({ "memory": memory }))
            .send()
            .await
            .map_err(|e| ProfileStoreError::Network(e.to_string()))?;
        Self::check(user_id, response).await?;
        Ok(())
    }
}

/// A profile store held in process memory.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: Arc<RwLock<HashMap<String, PatientProfile>>>,
    memories: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile.
    pub async fn insert(&self, user_id: impl Into<String>, profile: PatientProfile) {
        self.profiles.write().await.insert(user_id.into(), profile);
    }

    /// The stored memory string for `user_id`, if any.
    pub async fn memory(&self, user_id: &str) -> Option<String> {
        self.memories.read().await.get(user_id).cloned()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get_profile(&self, user_id: &str) -> Result<PatientProfile, ProfileStoreError> {
        self.profiles
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| ProfileStoreError::NotFound(user_id.to_string()))
    }

    async fn put_profile(
        &self,
        user_id: &str,
        profile: &PatientProfile,
    ) -> Result<(), ProfileStoreError> {
        self.profiles
            .write()
            .await
            .insert(user_id.to_string(), profile.clone());
        Ok(())
    }

    async fn get_memory(&self, user_id: &str) -> Result<Option<String>, ProfileStoreError> {
        Ok(self.memory(user_id).await)
    }

    async fn put_memory(&self, user_id: &str, memory: &str) -> Result<(), ProfileStoreError> {
        self.memories
            .write()
            .await
            .insert(user_id.to_string(), memory.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_body_accepts_both_shapes() {
        let wrapped: ProfileBody =
            serde_json::from_str(r#"{"profile":{"dietType":"vegetarian"}}"#).unwrap();
        let bare: ProfileBody = serde_json::from_str(r#"{"diet_type":"keto"}"#).unwrap();

        match wrapped {
            ProfileBody::Wrapped { profile } => {
                assert_eq!(profile.diet_type.as_deref(), Some("vegetarian"))
            }
            ProfileBody::Bare(_) => panic!("expected wrapped"),
        }
        match bare {
            ProfileBody::Bare(profile) => assert_eq!(profile.diet_type.as_deref(), Some("keto")),
            ProfileBody::Wrapped { .. } => panic!("expected bare"),
        }
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let store = HttpProfileStore::new("http://localhost:8002/", Duration::from_secs(5));
        assert_eq!(store.base_url, "http://localhost:8002");
    }

    #[tokio::test]
    async fn in_memory_round_trip() {
        let store = InMemoryProfileStore::new();
        assert!(matches!(
            store.get_profile("7").await,
            Err(ProfileStoreError::NotFound(_))
        ));

        let profile = PatientProfile {
            diet_type: Some("high protein".into()),
            ..Default::default()
        };
        store.put_profile("7", &profile).await.unwrap();
        assert_eq!(store.get_profile("7").await.unwrap(), profile);

        assert_eq!(store.get_memory("7").await.unwrap(), None);
        store.put_memory("7", r#"{"preferences":[]}"#).await.unwrap();
        assert_eq!(store.memory("7").await.as_deref(), Some(r#"{"preferences":[]}"#));
        assert_eq!(
            store.get_memory("7").await.unwrap().as_deref(),
            Some(r#"{"preferences":[]}"#)
        );
    }

    #[test]
    fn memory_body_accepts_both_shapes() {
        let wrapped: MemoryBody =
            serde_json::from_str(r#"{"memory":"{\"preferences\":[\"soft\"]}"}"#).unwrap();
        let empty: MemoryBody = serde_json::from_str(r#"{"memory":null}"#).unwrap();
        let bare: MemoryBody = serde_json::from_str(r#""likes broth""#).unwrap();

        assert!(matches!(wrapped, MemoryBody::Wrapped { memory: Some(m) } if m.contains("soft")));
        assert!(matches!(empty, MemoryBody::Wrapped { memory: None }));
        assert!(matches!(bare, MemoryBody::Bare(m) if m == "likes broth"));
    }

    #[tokio::test]
    async fn unreachable_service_is_network_error() {
        let store = HttpProfileStore::new("http://127.0.0.1:9", Duration::from_secs(1));
        let err = store.get_profile("1").await.unwrap_err();
        assert!(matches!(err, ProfileStoreError::Network(_)));
    }
}
