use axum::{extract::State, Extension, Json};

use crate::{
    api::{AppState, ValidatedJson},
    error::AppResult,
    middleware::RequestId,
    models::{
        ChatRequest, ChatResponse, FeedbackAnalysis, FeedbackAnalysisRequest, PatternAnalysis,
    },
    services::insights,
};

pub async fn analysis(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<PatternAnalysis>> {
    tracing::info!(%request_id, "Pattern analysis requested");

    let analysis = insights::analyze_patterns(state.profiles, state.records, state.model).await?;
    Ok(Json(analysis))
}

pub async fn chat(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidatedJson(request): ValidatedJson<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    tracing::info!(%request_id, chars = request.message.len(), "Chat message received");

    let reply = insights::chat(state.profiles, state.model, request.message).await?;
    Ok(Json(ChatResponse { reply }))
}

pub async fn feedback_analysis(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidatedJson(request): ValidatedJson<FeedbackAnalysisRequest>,
) -> AppResult<Json<FeedbackAnalysis>> {
    tracing::info!(%request_id, liked = request.liked, "Feedback analysis requested");

    let analysis = insights::process_feedback(
        state.model,
        &request.recommendation,
        request.liked,
        request.reason.as_deref(),
    )
    .await?;
    Ok(Json(analysis))
}
