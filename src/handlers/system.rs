use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::routes::route_table;
use crate::state::AppState;

/// GET / - service info and the registered routes
pub async fn root() -> Json<Value> {
    let routes: Vec<Value> = route_table()
        .iter()
        .map(|entry| {
            json!({
                "method": entry.method.as_str(),
                "path": entry.path,
                "operation_id": entry.operation_id,
                "summary": entry.summary,
                "requires": entry.operation.map(|op| op.as_str()),
            })
        })
        .collect();

    Json(json!({
        "success": true,
        "data": {
            "name": "Catalog Profile API",
            "version": env!("CARGO_PKG_VERSION"),
            "routes": routes,
        }
    }))
}

/// GET /health - liveness plus a repository round trip
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let repository = state.service.repository();

    match repository.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "storage": repository.backend(),
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "storage unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "storage": repository.backend(),
                    }
                })),
            )
        }
    }
}
