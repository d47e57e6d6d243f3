#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::task::JoinHandle;

use catalog_profile_api::auth::{AllowAllAuthorizer, Authorizer, JwtAuthorizer};
use catalog_profile_api::config::{AppConfig, AuthMode};
use catalog_profile_api::database::{EntityId, EntityRepository, EntityView, InMemoryRepository, ProfileRecord};
use catalog_profile_api::routes;
use catalog_profile_api::services::ProfileUpdateService;
use catalog_profile_api::state::AppState;

pub const JWT_SECRET: &str = "integration-secret";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub repository: Arc<InMemoryRepository>,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a table entity directly in the repository.
    pub async fn seed(&self, version: i64, latest: Option<ProfileRecord>) -> Result<EntityId> {
        let id = EntityId::new();
        let mut view = EntityView::table(id, "warehouse.sales.orders").with_version(version);
        view.latest_profile = latest;
        self.repository.register(view).await?;
        Ok(id)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

/// Start the router in-process on a free port, backed by a fresh in-memory
/// repository.
pub async fn spawn_server(config: AppConfig) -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let repository = Arc::new(InMemoryRepository::new());
    let authorizer: Arc<dyn Authorizer> = match config.security.auth_mode {
        AuthMode::Disabled => Arc::new(AllowAllAuthorizer),
        AuthMode::Jwt => Arc::new(JwtAuthorizer::new(&config.security.jwt_secret)?),
    };
    let service = ProfileUpdateService::new(repository.clone())
        .with_stale_policy(config.profile.stale_policy)
        .with_max_attempts(config.profile.max_cas_attempts);
    let app = routes::router(AppState::new(service, authorizer), &config);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let server = TestServer {
        port,
        base_url,
        repository,
        client: reqwest::Client::new(),
        handle,
    };
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

pub async fn spawn_default() -> Result<TestServer> {
    let mut config = AppConfig::development();
    config.api.enable_request_logging = false;
    spawn_server(config).await
}

pub async fn spawn_with_jwt() -> Result<TestServer> {
    let mut config = AppConfig::development();
    config.security.auth_mode = AuthMode::Jwt;
    config.security.jwt_secret = JWT_SECRET.to_string();
    spawn_server(config).await
}

/// `data` out of a success envelope, asserting the envelope shape.
pub fn data(body: &Value) -> &Value {
    assert_eq!(body["success"], Value::Bool(true), "not a success envelope: {}", body);
    &body["data"]
}
