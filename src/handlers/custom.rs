use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;

use crate::database::models::{EntityId, EntityView, ProfileRecord};
use crate::error::ApiError;
use crate::middleware::ApiResult;
use crate::state::AppState;

use super::entities::outcome_response;
use super::utils::{json_body, required_timestamp};

/// POST /custom/updateLatestTableProfile
///
/// Body shape used by existing profiler clients:
/// `{ "tableId": "<uuid>", "createTableProfile": { "tableProfile": { "timestamp": .. }, "columnProfile": [..] } }`.
/// The whole `createTableProfile` object becomes the stored payload. Its
/// timestamp is read from `tableProfile.timestamp`, or from a top-level
/// `timestamp` when the table profile does not carry one.
pub async fn update_latest_table_profile(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<EntityView> {
    let body = json_body(body)?;

    let table_id = body
        .get("tableId")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::invalid_field("tableId", "this field is required"))?
        .parse::<EntityId>()
        .map_err(|_| ApiError::invalid_field("tableId", "expected a UUID"))?;

    let profile = match body.get("createTableProfile") {
        Some(create @ Value::Object(_)) => {
            let timestamp = match create.get("tableProfile").and_then(|t| t.get("timestamp")) {
                Some(ts) => required_timestamp(Some(ts), "createTableProfile.tableProfile.timestamp")?,
                None => required_timestamp(create.get("timestamp"), "createTableProfile.timestamp")?,
            };
            ProfileRecord::new(timestamp, create.clone())
        }
        Some(_) => {
            return Err(ApiError::invalid_field("createTableProfile", "expected a JSON object"))
        }
        None => {
            return Err(ApiError::invalid_field("createTableProfile", "this field is required"))
        }
    };

    let outcome = state.service.update_latest_profile(table_id, profile).await?;
    Ok(outcome_response(outcome))
}
