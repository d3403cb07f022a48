//! Persistence layer
//!
//! Repositories are traits so the HTTP layer and services can run against
//! PostgreSQL in production and against in-memory or mocked stores in tests.
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        CreateRecordRequest, FeedbackRequest, FeedbackStats, GeneratedRecommendation, LifeRecord,
        PreferencesPatch, Profile, RecommendationType, RecordPage, RecordQuery, RecordStats,
        Routines, SavedRecommendation, UpdateRecordRequest, UpsertProfileRequest,
    },
};

pub mod postgres;

pub use postgres::{
    create_pool, run_migrations, PgProfileRepository, PgRecommendationRepository,
    PgRecordRepository,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileRepository: Send + Sync {
    /// The active profile: the oldest one, if any exists
    async fn find_first(&self) -> AppResult<Option<Profile>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>>;

    /// Creates the profile or replaces name, location and any supplied
    /// preferences/routines of the existing one, atomically.
    async fn upsert(&self, request: &UpsertProfileRequest) -> AppResult<Profile>;

    /// Replaces only the categories present in `patch`
    async fn update_preferences(
        &self,
        profile_id: Uuid,
        patch: &PreferencesPatch,
    ) -> AppResult<Profile>;

    /// Merges the fields present in `patch` into the stored routines
    async fn update_routines(&self, profile_id: Uuid, patch: &Routines) -> AppResult<Profile>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecordRepository: Send + Sync {
    async fn find_by_id(&self, profile_id: Uuid, id: Uuid) -> AppResult<Option<LifeRecord>>;

    /// Newest first by record date
    async fn list(&self, profile_id: Uuid, query: &RecordQuery) -> AppResult<RecordPage>;

    async fn create(&self, profile_id: Uuid, request: &CreateRecordRequest)
        -> AppResult<LifeRecord>;

    /// Returns `None` when the record does not exist for this profile
    async fn update(
        &self,
        profile_id: Uuid,
        id: Uuid,
        request: &UpdateRecordRequest,
    ) -> AppResult<Option<LifeRecord>>;

    /// Returns whether a record was deleted
    async fn delete(&self, profile_id: Uuid, id: Uuid) -> AppResult<bool>;

    async fn stats(&self, profile_id: Uuid) -> AppResult<RecordStats>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationRepository: Send + Sync {
    /// Persists a generated batch in one transaction, preserving order
    async fn save_many(
        &self,
        profile_id: Uuid,
        recommendation_type: RecommendationType,
        items: &[GeneratedRecommendation],
        context: Option<String>,
    ) -> AppResult<Vec<SavedRecommendation>>;

    /// Newest first, optionally filtered by type
    async fn history(
        &self,
        profile_id: Uuid,
        recommendation_type: Option<RecommendationType>,
        limit: i64,
    ) -> AppResult<Vec<SavedRecommendation>>;

    /// Appends a feedback row. Returns `false` when the recommendation does
    /// not belong to the profile, in which case nothing is written.
    async fn add_feedback(
        &self,
        profile_id: Uuid,
        recommendation_id: Uuid,
        feedback: &FeedbackRequest,
    ) -> AppResult<bool>;

    async fn feedback_stats(&self, profile_id: Uuid) -> AppResult<FeedbackStats>;
}
