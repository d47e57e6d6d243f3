use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::auth::{AllowAllAuthorizer, Authorizer, JwtAuthorizer};
use crate::config::{AppConfig, AuthMode, StorageBackend};
use crate::database::models::{EntityId, EntityView, ProfileRecord};
use crate::database::{DatabaseManager, EntityRepository, InMemoryRepository, PgEntityRepository};
use crate::services::ProfileUpdateService;
use crate::state::AppState;

/// One entry of the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedEntity {
    pub id: EntityId,
    pub fully_qualified_name: String,
    pub name: Option<String>,
    pub version: Option<i64>,
    pub latest_profile: Option<ProfileRecord>,
}

impl From<SeedEntity> for EntityView {
    fn from(seed: SeedEntity) -> Self {
        let mut view = EntityView::table(seed.id, seed.fully_qualified_name);
        if let Some(name) = seed.name {
            view.name = name;
        }
        if let Some(version) = seed.version {
            view.version = version;
        }
        view.latest_profile = seed.latest_profile;
        view
    }
}

/// Wire up repository, service and authorizer from configuration.
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    config.validate()?;

    let repository: Arc<dyn EntityRepository> = match config.storage.backend {
        StorageBackend::Memory => Arc::new(InMemoryRepository::new()),
        StorageBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to postgres")?;
            Arc::new(PgEntityRepository::new(pool))
        }
    };

    if let Some(path) = &config.storage.seed_file {
        let count = load_seed_file(repository.as_ref(), path).await?;
        info!("Registered {} seed entities from {}", count, path.display());
    }

    let authorizer: Arc<dyn Authorizer> = match config.security.auth_mode {
        AuthMode::Disabled => Arc::new(AllowAllAuthorizer),
        AuthMode::Jwt => Arc::new(JwtAuthorizer::new(&config.security.jwt_secret)?),
    };

    let service = ProfileUpdateService::new(repository)
        .with_stale_policy(config.profile.stale_policy)
        .with_max_attempts(config.profile.max_cas_attempts);

    info!(
        "Profile service ready (storage = {}, stale policy = {}, max CAS attempts = {})",
        service.repository().backend(),
        config.profile.stale_policy,
        config.profile.max_cas_attempts
    );

    Ok(AppState::new(service, authorizer))
}

/// Register every entity in a JSON seed file. Entities that already exist are
/// skipped so a restart against postgres does not fail.
pub async fn load_seed_file(repository: &dyn EntityRepository, path: &Path) -> anyhow::Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let seeds: Vec<SeedEntity> =
        serde_json::from_str(&raw).with_context(|| format!("invalid seed file {}", path.display()))?;

    let mut registered = 0;
    for seed in seeds {
        match repository.register(seed.into()).await {
            Ok(()) => registered += 1,
            Err(crate::database::RepositoryError::AlreadyExists(id)) => {
                tracing::debug!("Seed entity {} already registered", id);
            }
            Err(e) => return Err(e).context("failed to register seed entity"),
        }
    }
    Ok(registered)
}
