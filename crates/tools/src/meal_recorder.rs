//! Meal recording as a profile read-modify-write.
//!
//! There is no concurrency check between the read and the write: two
//! recordings for the same user at the same moment can lose one meal.

use std::sync::Arc;

use async_trait::async_trait;
use bariatric_core::error::ProfileStoreError;
use bariatric_core::profile::{MealEntry, MealRecorder, PatientProfile, ProfileStore};
use tracing::info;

/// Records meals by appending to the stored profile.
pub struct ProfileMealRecorder {
    store: Arc<dyn ProfileStore>,
}

impl ProfileMealRecorder {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MealRecorder for ProfileMealRecorder {
    async fn record(
        &self,
        user_id: &str,
        meal: &MealEntry,
    ) -> Result<PatientProfile, ProfileStoreError> {
        let mut profile = match self.store.get_profile(user_id).await {
            Ok(profile) => profile,
            Err(ProfileStoreError::NotFound(_)) => PatientProfile::default(),
            Err(e) => return Err(e),
        };

        profile.record_meal(meal.clone());
        self.store.put_profile(user_id, &profile).await?;

        info!(
            user_id,
            food = %meal.food,
            protein = meal.protein,
            calories = meal.calories,
            "Meal recorded"
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile_store::InMemoryProfileStore;

    #[tokio::test]
    async fn appends_to_existing_profile() {
        let store = Arc::new(InMemoryProfileStore::new());
        let mut seeded = PatientProfile::default();
        seeded.record_meal(MealEntry::clamped("eggs", 12.0, 140.0));
        store.insert("42", seeded).await;

        let recorder = ProfileMealRecorder::new(store.clone());
        let updated = recorder
            .record("42", &MealEntry::clamped("protein shake", 30.0, 200.0))
            .await
            .unwrap();

        assert_eq!(updated.todays_meals.len(), 2);
        assert!((updated.protein_today - 42.0).abs() < f64::EPSILON);
        assert_eq!(store.get_profile("42").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn missing_profile_starts_fresh() {
        let store = Arc::new(InMemoryProfileStore::new());
        let recorder = ProfileMealRecorder::new(store.clone());
        let updated = recorder
            .record("new-user", &MealEntry::clamped("cottage cheese", 14.0, 110.0))
            .await
            .unwrap();
        assert_eq!(updated.todays_meals.len(), 1);
        assert!(store.get_profile("new-user").await.is_ok());
    }

    struct DownStore;

    #[async_trait]
    impl ProfileStore for DownStore {
        fn name(&self) -> &str {
            "down"
        }
        async fn get_profile(&self, _: &str) -> Result<PatientProfile, ProfileStoreError> {
            Err(ProfileStoreError::Network("connection refused".into()))
        }
        async fn put_profile(&self, _: &str, _: &PatientProfile) -> Result<(), ProfileStoreError> {
            Err(ProfileStoreError::Network("connection refused".into()))
        }
        async fn put_memory(&self, _: &str, _: &str) -> Result<(), ProfileStoreError> {
            Err(ProfileStoreError::Network("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let recorder = ProfileMealRecorder::new(Arc::new(DownStore));
        let err = recorder
            .record("1", &MealEntry::clamped("soup", 8.0, 100.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileStoreError::Network(_)));
    }
}
