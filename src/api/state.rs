use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::Config,
    db::{
        PgProfileRepository, PgRecommendationRepository, PgRecordRepository, ProfileRepository,
        RecommendationRepository, RecordRepository,
    },
    services::{GeminiProvider, LanguageModel},
};

/// Shared application state
///
/// Cheap to clone; every handler gets its own copy of the `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<dyn ProfileRepository>,
    pub records: Arc<dyn RecordRepository>,
    pub recommendations: Arc<dyn RecommendationRepository>,
    pub model: Arc<dyn LanguageModel>,
}

impl AppState {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        records: Arc<dyn RecordRepository>,
        recommendations: Arc<dyn RecommendationRepository>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            profiles,
            records,
            recommendations,
            model,
        }
    }

    /// PostgreSQL repositories over `pool` and a Gemini model from `config`
    pub fn from_pool(pool: PgPool, config: &Config) -> Self {
        Self::new(
            Arc::new(PgProfileRepository::new(pool.clone())),
            Arc::new(PgRecordRepository::new(pool.clone())),
            Arc::new(PgRecommendationRepository::new(pool)),
            Arc::new(GeminiProvider::new(
                config.gemini_api_key.clone(),
                config.gemini_api_url.clone(),
                config.gemini_model.clone(),
            )),
        )
    }
}
