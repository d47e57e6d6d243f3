use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderName, HeaderValue},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::database::models::{EntityView, ProfileRange, ProfileRecord};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::profiler::ProfileSummary;
use crate::services::UpdateOutcome;
use crate::state::AppState;

use super::utils::{json_body, parse_entity_id, profile_from_body, stale_policy_param};

pub const OUTCOME_HEADER: &str = "x-profile-outcome";

#[derive(Debug, Deserialize)]
pub struct UpdateQuery {
    /// Per-request stale policy: `ignore` or `reject`.
    pub stale: Option<String>,
}

/// GET /entities/:entity_id
pub async fn get(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> ApiResult<EntityView> {
    let id = parse_entity_id(&entity_id)?;
    let view = state.service.get_entity(id).await?;
    Ok(ApiResponse::success(view))
}

/// GET /entities/:entity_id/profile
pub async fn latest_profile(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> ApiResult<ProfileRecord> {
    let id = parse_entity_id(&entity_id)?;
    let profile = state
        .service
        .latest_profile(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("entity {} has no profile", id)))?;
    Ok(ApiResponse::success(profile))
}

/// POST /entities/:entity_id/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    Query(query): Query<UpdateQuery>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<EntityView> {
    let id = parse_entity_id(&entity_id)?;
    let policy = stale_policy_param(query.stale.as_deref(), state.service.stale_policy())?;
    let profile = profile_from_body(&json_body(body)?)?;

    let outcome = state
        .service
        .update_latest_profile_with(id, profile, policy)
        .await?;
    Ok(outcome_response(outcome))
}

/// GET /entities/:entity_id/profiles?start_ts=&end_ts=
pub async fn list_profiles(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    range: Result<Query<ProfileRange>, QueryRejection>,
) -> ApiResult<Vec<ProfileRecord>> {
    let id = parse_entity_id(&entity_id)?;
    let Query(range) = range.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    if range.is_inverted() {
        return Err(ApiError::bad_request("start_ts must not be after end_ts"));
    }
    let profiles = state.service.list_profiles(id, range).await?;
    Ok(ApiResponse::success(profiles))
}

/// GET /entities/:entity_id/profile/summary
pub async fn profile_summary(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> ApiResult<ProfileSummary> {
    let id = parse_entity_id(&entity_id)?;
    let summary = state
        .service
        .profile_summary(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("entity {} has no profile", id)))?;
    Ok(ApiResponse::success(summary))
}

/// Entity view in the success envelope, tagged with whether a commit happened.
pub fn outcome_response(outcome: UpdateOutcome) -> ApiResponse<EntityView> {
    let label = outcome.label();
    ApiResponse::success(outcome.into_view()).with_header(
        HeaderName::from_static(OUTCOME_HEADER),
        HeaderValue::from_static(label),
    )
}
