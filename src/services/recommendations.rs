use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{ProfileRepository, RecommendationRepository, RecordRepository},
    error::{AppError, AppResult},
    models::{
        FeedbackRequest, GeneratedRecommendations, Profile, RecommendationItem,
        RecommendationRequest, RecommendationResponse, RecordQuery,
    },
    services::{llm::generate_json, prompts, providers::LanguageModel},
};

/// Records fetched as context for a recommendation prompt
pub const RECENT_RECORD_LIMIT: i64 = 10;

pub const NO_PROFILE_MESSAGE: &str = "Profile not found. Please set up your profile first.";

/// Resolves the active profile or fails with NotFound
pub async fn require_profile(profiles: &dyn ProfileRepository) -> AppResult<Profile> {
    profiles
        .find_first()
        .await?
        .ok_or_else(|| AppError::NotFound(NO_PROFILE_MESSAGE.to_string()))
}

/// Generates personalized recommendations
///
/// Looks up the profile and its recent records of the requested type, asks the
/// language model for suggestions, and persists what comes back as history.
/// Nothing is persisted unless the model's answer parses and validates.
pub async fn get_recommendations(
    profiles: Arc<dyn ProfileRepository>,
    records: Arc<dyn RecordRepository>,
    history: Arc<dyn RecommendationRepository>,
    model: Arc<dyn LanguageModel>,
    request: RecommendationRequest,
) -> AppResult<RecommendationResponse> {
    let profile = require_profile(profiles.as_ref()).await?;

    let recent = records
        .list(
            profile.id,
            &RecordQuery {
                record_type: Some(request.recommendation_type.record_type()),
                limit: Some(RECENT_RECORD_LIMIT),
                offset: None,
            },
        )
        .await?
        .records;

    let prompt = prompts::build_recommendation_prompt(
        request.recommendation_type,
        &profile,
        request.context.as_deref(),
        request.location.as_deref(),
        &recent,
    );

    tracing::debug!(
        provider = model.name(),
        recommendation_type = %request.recommendation_type,
        recent_records = recent.len(),
        "Requesting recommendations from language model"
    );

    let mut generated: GeneratedRecommendations = generate_json(model.as_ref(), &prompt).await?;
    // Only items within the limit are validated
    generated.recommendations.truncate(request.limit as usize);
    generated.validate().map_err(|e| {
        AppError::Upstream(format!("AI response did not match the expected shape: {}", e))
    })?;

    let saved = history
        .save_many(
            profile.id,
            request.recommendation_type,
            &generated.recommendations,
            request.context.clone(),
        )
        .await?;

    tracing::info!(
        profile_id = %profile.id,
        recommendation_type = %request.recommendation_type,
        count = saved.len(),
        "Recommendations generated"
    );

    Ok(RecommendationResponse {
        recommendation_type: request.recommendation_type,
        recommendations: saved.into_iter().map(RecommendationItem::from).collect(),
        generated_at: Utc::now(),
        context: request.context,
    })
}

/// Records a like/dislike for a recommendation
///
/// Every call appends a new row. An id that does not belong to the active
/// profile, or is not a valid id at all, is ignored with a warning rather
/// than reported as an error.
pub async fn submit_feedback(
    profiles: Arc<dyn ProfileRepository>,
    history: Arc<dyn RecommendationRepository>,
    recommendation_id: &str,
    feedback: FeedbackRequest,
) -> AppResult<()> {
    let profile = require_profile(profiles.as_ref()).await?;

    let Ok(id) = Uuid::parse_str(recommendation_id) else {
        tracing::warn!(
            recommendation_id,
            "Feedback for malformed recommendation id ignored"
        );
        return Ok(());
    };

    let stored = history.add_feedback(profile.id, id, &feedback).await?;

    if stored {
        tracing::info!(
            recommendation_id = %id,
            liked = feedback.liked,
            "Feedback recorded"
        );
    } else {
        tracing::warn!(
            recommendation_id = %id,
            "Feedback for unknown recommendation ignored"
        );
    }

    Ok(())
}
