use axum::{extract::State, Extension, Json};

use crate::{
    api::{ApiPath, ApiQuery, AppState, ValidatedJson},
    error::AppResult,
    middleware::RequestId,
    models::{
        recommendation::HISTORY_LIMIT, ApiResponse, FeedbackRequest, FeedbackStats, HistoryQuery,
        HistoryResponse, RecommendationRequest, RecommendationResponse,
    },
    services::recommendations::{self, require_profile},
};

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidatedJson(request): ValidatedJson<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    tracing::info!(
        %request_id,
        recommendation_type = %request.recommendation_type,
        limit = request.limit,
        "Recommendation requested"
    );

    let response = recommendations::get_recommendations(
        state.profiles,
        state.records,
        state.recommendations,
        state.model,
        request,
    )
    .await?;

    Ok(Json(response))
}

pub async fn history(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> AppResult<Json<HistoryResponse>> {
    let profile = require_profile(state.profiles.as_ref()).await?;
    let history = state
        .recommendations
        .history(profile.id, query.recommendation_type, HISTORY_LIMIT)
        .await?;

    Ok(Json(HistoryResponse { history }))
}

pub async fn feedback(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiPath(id): ApiPath<String>,
    ValidatedJson(request): ValidatedJson<FeedbackRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    tracing::debug!(%request_id, recommendation_id = %id, "Feedback received");

    recommendations::submit_feedback(state.profiles, state.recommendations, &id, request).await?;

    Ok(Json(ApiResponse::message(
        "Thanks for the feedback. It will shape your next recommendations!",
    )))
}

pub async fn feedback_stats(State(state): State<AppState>) -> AppResult<Json<FeedbackStats>> {
    let profile = require_profile(state.profiles.as_ref()).await?;
    let stats = state.recommendations.feedback_stats(profile.id).await?;
    Ok(Json(stats))
}
