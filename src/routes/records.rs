use axum::{extract::State, Extension, Json};
use uuid::Uuid;

use crate::{
    api::{ApiPath, ApiQuery, AppState, ValidatedJson},
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{
        ApiResponse, CreateRecordRequest, LifeRecord, Pagination, RecordListResponse, RecordQuery,
        RecordStats, UpdateRecordRequest,
    },
    services::recommendations::require_profile,
};

fn record_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Record {} not found", id))
}

/// Record ids that are not UUIDs cannot exist, so they are reported as missing
fn parse_record_id(id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| record_not_found(id))
}

/// Lists records newest first, with an unpaginated total
pub async fn list_records(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecordQuery>,
) -> AppResult<Json<RecordListResponse>> {
    let profile = require_profile(state.profiles.as_ref()).await?;
    let page = state.records.list(profile.id, &query).await?;

    Ok(Json(RecordListResponse {
        records: page.records,
        pagination: Pagination {
            total: page.total,
            limit: query.limit(),
            offset: query.offset(),
        },
    }))
}

pub async fn get_record(
    State(state): State<AppState>,
    ApiPath(raw_id): ApiPath<String>,
) -> AppResult<Json<LifeRecord>> {
    let profile = require_profile(state.profiles.as_ref()).await?;
    let id = parse_record_id(&raw_id)?;
    let record = state
        .records
        .find_by_id(profile.id, id)
        .await?
        .ok_or_else(|| record_not_found(&raw_id))?;

    Ok(Json(record))
}

pub async fn create_record(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidatedJson(request): ValidatedJson<CreateRecordRequest>,
) -> AppResult<Json<ApiResponse<LifeRecord>>> {
    let profile = require_profile(state.profiles.as_ref()).await?;
    let record = state.records.create(profile.id, &request).await?;

    tracing::info!(
        %request_id,
        record_id = %record.id,
        record_type = %record.record_type,
        tags = record.tags.len(),
        "Record created"
    );

    Ok(Json(ApiResponse::with_message(
        "Record saved. It will be reflected in your taste analysis!",
        record,
    )))
}

pub async fn update_record(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiPath(raw_id): ApiPath<String>,
    ValidatedJson(request): ValidatedJson<UpdateRecordRequest>,
) -> AppResult<Json<ApiResponse<LifeRecord>>> {
    let profile = require_profile(state.profiles.as_ref()).await?;
    let id = parse_record_id(&raw_id)?;
    let record = state
        .records
        .update(profile.id, id, &request)
        .await?
        .ok_or_else(|| record_not_found(&raw_id))?;

    tracing::info!(%request_id, record_id = %id, "Record updated");

    Ok(Json(ApiResponse::data(record)))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiPath(raw_id): ApiPath<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    let profile = require_profile(state.profiles.as_ref()).await?;
    let id = parse_record_id(&raw_id)?;
    if !state.records.delete(profile.id, id).await? {
        return Err(record_not_found(&raw_id));
    }

    tracing::info!(%request_id, record_id = %id, "Record deleted");

    Ok(Json(ApiResponse::message("Record deleted.")))
}

pub async fn stats(State(state): State<AppState>) -> AppResult<Json<RecordStats>> {
    let profile = require_profile(state.profiles.as_ref()).await?;
    let stats = state.records.stats(profile.id).await?;
    Ok(Json(stats))
}
