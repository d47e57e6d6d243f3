use std::sync::Arc;

use crate::auth::Authorizer;
use crate::services::ProfileUpdateService;

/// Collaborators shared by all handlers. Built once in `main` (or a test)
/// and injected through axum state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProfileUpdateService>,
    pub authorizer: Arc<dyn Authorizer>,
}

impl AppState {
    pub fn new(service: ProfileUpdateService, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            service: Arc::new(service),
            authorizer,
        }
    }
}
