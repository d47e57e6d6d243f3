use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthError, Authorizer};
use crate::error::ApiError;
use crate::types::Operation;

/// Per-route authorization state: the authorizer plus the operation the
/// route performs.
#[derive(Clone)]
pub struct AccessGate {
    pub authorizer: Arc<dyn Authorizer>,
    pub operation: Operation,
}

/// Runs the authorizer before the handler and stores the resulting
/// [`Principal`](crate::auth::Principal) in request extensions.
pub async fn require_access(
    State(gate): State<AccessGate>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers)?;
    let principal = gate.authorizer.authorize(token.as_deref(), gate.operation)?;

    tracing::debug!(
        "Authorized {} for {}",
        principal.subject,
        gate.operation.as_str()
    );
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Bearer token from the Authorization header. Absent header is `None`;
/// a header in any other format is rejected outright.
fn extract_bearer(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::Unauthorized("Invalid Authorization header format".to_string()))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        Some(_) => Err(AuthError::Unauthorized("Empty JWT token".to_string())),
        None => Err(AuthError::Unauthorized(
            "Authorization header must use Bearer token format".to_string(),
        )),
    }
}
