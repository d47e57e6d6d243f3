use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::Value;

use crate::database::models::{EntityId, ProfileRecord};
use crate::error::ApiError;
use crate::services::StalePolicy;

/// Path ids that are not UUIDs cannot name an entity, so they are reported as
/// not found without touching storage.
pub fn parse_entity_id(raw: &str) -> Result<EntityId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found(format!("entity {} not found", raw)))
}

/// Unwrap a JSON body, turning every kind of body rejection into a 422.
pub fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::invalid_field("body", rejection.body_text())),
    }
}

/// Validate `{ "timestamp": <int64>, "payload": {...} }`.
pub fn profile_from_body(body: &Value) -> Result<ProfileRecord, ApiError> {
    let object = body
        .as_object()
        .ok_or_else(|| ApiError::invalid_field("body", "expected a JSON object"))?;

    let timestamp = required_timestamp(object.get("timestamp"), "timestamp")?;

    let payload = match object.get("payload") {
        Some(payload @ Value::Object(_)) => payload.clone(),
        Some(_) => return Err(ApiError::invalid_field("payload", "expected a JSON object")),
        None => return Err(ApiError::invalid_field("payload", "this field is required")),
    };

    Ok(ProfileRecord::new(timestamp, payload))
}

pub fn required_timestamp(value: Option<&Value>, field: &str) -> Result<i64, ApiError> {
    match value {
        None | Some(Value::Null) => Err(ApiError::invalid_field(field, "this field is required")),
        Some(v) => v
            .as_i64()
            .ok_or_else(|| ApiError::invalid_field(field, "expected a 64-bit integer")),
    }
}

pub fn stale_policy_param(raw: Option<&str>, default: StalePolicy) -> Result<StalePolicy, ApiError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(ApiError::bad_request),
    }
}
