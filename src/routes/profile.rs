use axum::{extract::State, Extension, Json};

use crate::{
    api::{AppState, ValidatedJson},
    error::AppResult,
    middleware::RequestId,
    models::{ApiResponse, PreferencesPatch, Profile, Routines, UpsertProfileRequest},
    services::recommendations::require_profile,
};

pub async fn get_profile(State(state): State<AppState>) -> AppResult<Json<Profile>> {
    let profile = require_profile(state.profiles.as_ref()).await?;
    Ok(Json(profile))
}

/// Creates the profile, or replaces the existing one's fields
pub async fn upsert_profile(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidatedJson(request): ValidatedJson<UpsertProfileRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = state.profiles.upsert(&request).await?;

    tracing::info!(%request_id, profile_id = %profile.id, "Profile saved");

    Ok(Json(ApiResponse::data(profile)))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidatedJson(patch): ValidatedJson<PreferencesPatch>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = require_profile(state.profiles.as_ref()).await?;
    let profile = state.profiles.update_preferences(profile.id, &patch).await?;

    tracing::info!(
        %request_id,
        profile_id = %profile.id,
        categories = patch.entries().count(),
        "Preferences updated"
    );

    Ok(Json(ApiResponse::with_message(
        "Preferences updated.",
        profile,
    )))
}

pub async fn update_routines(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidatedJson(patch): ValidatedJson<Routines>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = require_profile(state.profiles.as_ref()).await?;
    let profile = state.profiles.update_routines(profile.id, &patch).await?;

    tracing::info!(%request_id, profile_id = %profile.id, "Routines updated");

    Ok(Json(ApiResponse::with_message("Routines updated.", profile)))
}
