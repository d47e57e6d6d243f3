//! Route table.
//!
//! Every endpoint is declared once in [`route_table`] with its method, path,
//! operation id and the operation the authorizer must allow. The router, the
//! authorization layers and the `GET /` index are all built from that table.

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware::from_fn_with_state,
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::handlers::{custom, entities, system};
use crate::middleware::{require_access, AccessGate};
use crate::state::AppState;
use crate::types::Operation;

pub struct RouteEntry {
    pub method: Method,
    pub path: &'static str,
    pub operation_id: &'static str,
    pub summary: &'static str,
    /// `None` for public routes.
    pub operation: Option<Operation>,
    pub handler: fn() -> MethodRouter<AppState>,
}

pub fn route_table() -> Vec<RouteEntry> {
    vec![
        RouteEntry {
            method: Method::GET,
            path: "/",
            operation_id: "serviceInfo",
            summary: "Service information and route table",
            operation: None,
            handler: || get(system::root),
        },
        RouteEntry {
            method: Method::GET,
            path: "/health",
            operation_id: "health",
            summary: "Liveness and storage health",
            operation: None,
            handler: || get(system::health),
        },
        RouteEntry {
            method: Method::GET,
            path: "/entities/:entity_id",
            operation_id: "getEntity",
            summary: "Current entity view",
            operation: Some(Operation::ViewEntity),
            handler: || get(entities::get),
        },
        RouteEntry {
            method: Method::GET,
            path: "/entities/:entity_id/profile",
            operation_id: "getLatestProfile",
            summary: "Latest profile of an entity",
            operation: Some(Operation::ViewEntity),
            handler: || get(entities::latest_profile),
        },
        RouteEntry {
            method: Method::POST,
            path: "/entities/:entity_id/profile",
            operation_id: "updateLatestProfile",
            summary: "Replace the latest profile if the timestamp is newer",
            operation: Some(Operation::EditProfile),
            handler: || post(entities::update_profile),
        },
        RouteEntry {
            method: Method::GET,
            path: "/entities/:entity_id/profiles",
            operation_id: "listProfiles",
            summary: "Profile history within an optional timestamp window",
            operation: Some(Operation::ViewEntity),
            handler: || get(entities::list_profiles),
        },
        RouteEntry {
            method: Method::GET,
            path: "/entities/:entity_id/profile/summary",
            operation_id: "getProfileSummary",
            summary: "Row, column and accuracy summary of the latest profile",
            operation: Some(Operation::ViewEntity),
            handler: || get(entities::profile_summary),
        },
        RouteEntry {
            method: Method::POST,
            path: "/custom/updateLatestTableProfile",
            operation_id: "updateTableCustomProfile",
            summary: "Update latest table profile (legacy request shape)",
            operation: Some(Operation::EditProfile),
            handler: || post(custom::update_latest_table_profile),
        },
    ]
}

/// Build the application router from the route table.
pub fn router(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new();

    for entry in route_table() {
        let mut method_router = (entry.handler)();
        if let Some(operation) = entry.operation {
            let gate = AccessGate {
                authorizer: state.authorizer.clone(),
                operation,
            };
            method_router = method_router.route_layer(from_fn_with_state(gate, require_access));
        }
        router = router.route(entry.path, method_router);
    }

    let mut router = router
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}
