use async_trait::async_trait;
use thiserror::Error;

use crate::database::models::{EntityId, EntityView, ProfileRange, ProfileRecord};

/// Failures reported by an [`EntityRepository`].
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(EntityId),

    #[error("Version mismatch for {id}: expected {expected}, found {actual}")]
    VersionMismatch {
        id: EntityId,
        expected: i64,
        actual: i64,
    },

    #[error("Entity already registered: {0}")]
    AlreadyExists(EntityId),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::Storage(err.to_string())
    }
}

/// Storage collaborator for catalog entities and their profiles.
///
/// `get` and `compare_and_swap_profile` must each be atomic at the storage
/// layer: a reader observes either the whole committed view or the previous
/// one, never a partially written profile.
#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;

    async fn get(&self, id: EntityId) -> Result<EntityView, RepositoryError>;

    /// Replace the latest profile and bump `version` to `expected_version + 1`,
    /// but only if the stored version is still `expected_version`. The profile
    /// is also written to history, replacing any row with the same timestamp.
    async fn compare_and_swap_profile(
        &self,
        id: EntityId,
        expected_version: i64,
        profile: ProfileRecord,
    ) -> Result<EntityView, RepositoryError>;

    /// Profile history in ascending timestamp order.
    async fn list_profiles(
        &self,
        id: EntityId,
        range: ProfileRange,
    ) -> Result<Vec<ProfileRecord>, RepositoryError>;

    /// Bootstrap path for fixtures and seed files. Entity creation proper
    /// belongs to the catalog's entity workflow.
    async fn register(&self, view: EntityView) -> Result<(), RepositoryError>;

    async fn health_check(&self) -> Result<(), RepositoryError>;
}
