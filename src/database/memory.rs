use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::database::models::{EntityId, EntityView, ProfileRange, ProfileRecord};
use crate::database::repository::{EntityRepository, RepositoryError};

struct StoredEntity {
    view: EntityView,
    history: BTreeMap<i64, ProfileRecord>,
}

/// Process-local repository. The write lock makes each compare-and-swap
/// atomic; it is never held across an await point outside this module.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    entities: Arc<RwLock<HashMap<EntityId, StoredEntity>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }
}

#[async_trait]
impl EntityRepository for InMemoryRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, id: EntityId) -> Result<EntityView, RepositoryError> {
        let entities = self.entities.read().await;
        entities
            .get(&id)
            .map(|stored| stored.view.clone())
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn compare_and_swap_profile(
        &self,
        id: EntityId,
        expected_version: i64,
        profile: ProfileRecord,
    ) -> Result<EntityView, RepositoryError> {
        let mut entities = self.entities.write().await;
        let stored = entities.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;

        if stored.view.version != expected_version {
            return Err(RepositoryError::VersionMismatch {
                id,
                expected: expected_version,
                actual: stored.view.version,
            });
        }

        let next = stored.view.next_with_profile(profile.clone()).ok_or_else(|| {
            RepositoryError::Storage(format!("version of {} cannot advance past {}", id, expected_version))
        })?;
        stored.history.insert(profile.timestamp, profile);
        stored.view = next.clone();

        debug!("Committed profile for {} at version {}", id, next.version);
        Ok(next)
    }

    async fn list_profiles(
        &self,
        id: EntityId,
        range: ProfileRange,
    ) -> Result<Vec<ProfileRecord>, RepositoryError> {
        let entities = self.entities.read().await;
        let stored = entities.get(&id).ok_or(RepositoryError::NotFound(id))?;

        Ok(stored
            .history
            .values()
            .filter(|p| range.contains(p.timestamp))
            .cloned()
            .collect())
    }

    async fn register(&self, view: EntityView) -> Result<(), RepositoryError> {
        let mut entities = self.entities.write().await;
        if entities.contains_key(&view.id) {
            return Err(RepositoryError::AlreadyExists(view.id));
        }

        let mut history = BTreeMap::new();
        if let Some(profile) = &view.latest_profile {
            history.insert(profile.timestamp, profile.clone());
        }

        entities.insert(view.id, StoredEntity { view, history });
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seeded(version: i64) -> (InMemoryRepository, EntityId) {
        let repo = InMemoryRepository::new();
        let id = EntityId::new();
        repo.register(EntityView::table(id, "db.orders").with_version(version))
            .await
            .unwrap();
        (repo, id)
    }

    #[tokio::test]
    async fn cas_commits_on_matching_version() {
        let (repo, id) = seeded(5).await;

        let view = repo
            .compare_and_swap_profile(id, 5, ProfileRecord::new(10, json!({"rowCount": 3})))
            .await
            .unwrap();

        assert_eq!(view.version, 6);
        assert_eq!(repo.get(id).await.unwrap(), view);
    }

    #[tokio::test]
    async fn cas_at_max_version_fails_without_writing() {
        let (repo, id) = seeded(i64::MAX).await;

        let err = repo
            .compare_and_swap_profile(id, i64::MAX, ProfileRecord::new(10, json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Storage(_)));
        let view = repo.get(id).await.unwrap();
        assert_eq!(view.version, i64::MAX);
        assert!(view.latest_profile.is_none());
        assert!(repo.list_profiles(id, ProfileRange::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cas_rejects_stale_version_without_writing() {
        let (repo, id) = seeded(5).await;

        let err = repo
            .compare_and_swap_profile(id, 4, ProfileRecord::new(10, json!({})))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RepositoryError::VersionMismatch { expected: 4, actual: 5, .. }
        ));
        let view = repo.get(id).await.unwrap();
        assert_eq!(view.version, 5);
        assert!(view.latest_profile.is_none());
        assert!(repo.list_profiles(id, ProfileRange::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_entity_is_not_found() {
        let repo = InMemoryRepository::new();
        let id = EntityId::new();

        assert!(matches!(repo.get(id).await, Err(RepositoryError::NotFound(_))));
        assert!(matches!(
            repo.compare_and_swap_profile(id, 1, ProfileRecord::new(1, json!({}))).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn history_is_ordered_and_filtered() {
        let (repo, id) = seeded(1).await;
        for (version, ts) in [(1, 30), (2, 10), (3, 20)] {
            repo.compare_and_swap_profile(id, version, ProfileRecord::new(ts, json!({"ts": ts})))
                .await
                .unwrap();
        }

        let all = repo.list_profiles(id, ProfileRange::default()).await.unwrap();
        let stamps: Vec<i64> = all.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![10, 20, 30]);

        let window = ProfileRange { start_ts: Some(15), end_ts: Some(30) };
        assert_eq!(repo.list_profiles(id, window).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn register_twice_fails() {
        let (repo, id) = seeded(1).await;
        let err = repo.register(EntityView::table(id, "db.orders")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists(_)));
        assert_eq!(repo.len().await, 1);
    }
}
