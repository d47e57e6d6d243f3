use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{EntityId, EntityView, ProfileRange, ProfileRecord};
use crate::database::repository::{EntityRepository, RepositoryError};

const ENTITY_COLUMNS: &str =
    "id, entity_type, name, fully_qualified_name, version, latest_profile, updated_at";

/// Postgres-backed repository. The compare-and-swap is a single conditional
/// `UPDATE ... WHERE version = $2`, so the row lock taken by postgres decides
/// which of two racing writers commits.
#[derive(Clone)]
pub struct PgEntityRepository {
    pool: PgPool,
}

impl PgEntityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_version(&self, id: EntityId) -> Result<Option<i64>, RepositoryError> {
        let version = sqlx::query_scalar::<_, i64>("SELECT version FROM catalog_entities WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(version)
    }
}

fn row_to_view(row: &PgRow) -> Result<EntityView, RepositoryError> {
    let id: Uuid = row.try_get("id")?;
    let latest_profile: Option<Json<ProfileRecord>> = row.try_get("latest_profile")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(EntityView {
        id: EntityId::from(id),
        name: row.try_get("name")?,
        fully_qualified_name: row.try_get("fully_qualified_name")?,
        entity_type: row.try_get("entity_type")?,
        version: row.try_get("version")?,
        latest_profile: latest_profile.map(|Json(profile)| profile),
        updated_at,
    })
}

#[async_trait]
impl EntityRepository for PgEntityRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn get(&self, id: EntityId) -> Result<EntityView, RepositoryError> {
        let sql = format!("SELECT {} FROM catalog_entities WHERE id = $1", ENTITY_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;
        row_to_view(&row)
    }

    async fn compare_and_swap_profile(
        &self,
        id: EntityId,
        expected_version: i64,
        profile: ProfileRecord,
    ) -> Result<EntityView, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE catalog_entities \
             SET latest_profile = $3, version = version + 1, updated_at = now() \
             WHERE id = $1 AND version = $2 \
             RETURNING {}",
            ENTITY_COLUMNS
        );
        let updated = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(expected_version)
            .bind(Json(&profile))
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = updated else {
            tx.rollback().await?;
            return match self.current_version(id).await? {
                Some(actual) => Err(RepositoryError::VersionMismatch {
                    id,
                    expected: expected_version,
                    actual,
                }),
                None => Err(RepositoryError::NotFound(id)),
            };
        };
        let view = row_to_view(&row)?;

        sqlx::query(
            "INSERT INTO catalog_entity_profiles (entity_id, timestamp, payload) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (entity_id, timestamp) DO UPDATE SET payload = EXCLUDED.payload",
        )
        .bind(id.as_uuid())
        .bind(profile.timestamp)
        .bind(&profile.payload)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Committed profile for {} at version {}", id, view.version);
        Ok(view)
    }

    async fn list_profiles(
        &self,
        id: EntityId,
        range: ProfileRange,
    ) -> Result<Vec<ProfileRecord>, RepositoryError> {
        if self.current_version(id).await?.is_none() {
            return Err(RepositoryError::NotFound(id));
        }

        let rows = sqlx::query(
            "SELECT timestamp, payload FROM catalog_entity_profiles \
             WHERE entity_id = $1 \
               AND ($2::BIGINT IS NULL OR timestamp >= $2) \
               AND ($3::BIGINT IS NULL OR timestamp <= $3) \
             ORDER BY timestamp ASC",
        )
        .bind(id.as_uuid())
        .bind(range.start_ts)
        .bind(range.end_ts)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ProfileRecord, RepositoryError> {
                Ok(ProfileRecord {
                    timestamp: row.try_get("timestamp")?,
                    payload: row.try_get("payload")?,
                })
            })
            .collect()
    }

    async fn register(&self, view: EntityView) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO catalog_entities \
             (id, entity_type, name, fully_qualified_name, version, latest_profile, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(view.id.as_uuid())
        .bind(&view.entity_type)
        .bind(&view.name)
        .bind(&view.fully_qualified_name)
        .bind(view.version)
        .bind(view.latest_profile.as_ref().map(Json))
        .bind(view.updated_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::AlreadyExists(view.id));
        }

        if let Some(profile) = &view.latest_profile {
            sqlx::query(
                "INSERT INTO catalog_entity_profiles (entity_id, timestamp, payload) VALUES ($1, $2, $3)",
            )
            .bind(view.id.as_uuid())
            .bind(profile.timestamp)
            .bind(&profile.payload)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        DatabaseManager::health_check(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))
    }
}
