use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::database::models::{EntityId, EntityView, ProfileRange, ProfileRecord};
use crate::database::repository::{EntityRepository, RepositoryError};
use crate::profiler::ProfileSummary;

/// What to do with a profile whose timestamp is not newer than the current
/// latest profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalePolicy {
    /// Treat the update as a no-op and return the current view.
    #[default]
    Ignore,
    /// Fail with [`ProfileError::StaleUpdate`]. An exact replay of the current
    /// latest profile is still a no-op.
    Reject,
}

impl FromStr for StalePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(StalePolicy::Ignore),
            "reject" => Ok(StalePolicy::Reject),
            other => Err(format!("unknown stale policy '{}' (expected ignore or reject)", other)),
        }
    }
}

impl fmt::Display for StalePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StalePolicy::Ignore => write!(f, "ignore"),
            StalePolicy::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Entity not found: {0}")]
    NotFound(EntityId),

    #[error("Stale profile for {id}: timestamp {timestamp} is not newer than latest {latest}")]
    StaleUpdate {
        id: EntityId,
        timestamp: i64,
        latest: i64,
    },

    #[error("Concurrent modification of {id}: gave up after {attempts} attempts")]
    ConcurrentModification { id: EntityId, attempts: u32 },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ProfileError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => ProfileError::NotFound(id),
            other => ProfileError::Storage(other.to_string()),
        }
    }
}

/// Result of an update request. Both arms carry the entity view as it stands
/// after the call.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(EntityView),
    Unchanged(EntityView),
}

impl UpdateOutcome {
    pub fn view(&self) -> &EntityView {
        match self {
            UpdateOutcome::Updated(view) | UpdateOutcome::Unchanged(view) => view,
        }
    }

    pub fn into_view(self) -> EntityView {
        match self {
            UpdateOutcome::Updated(view) | UpdateOutcome::Unchanged(view) => view,
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, UpdateOutcome::Updated(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            UpdateOutcome::Updated(_) => "updated",
            UpdateOutcome::Unchanged(_) => "unchanged",
        }
    }
}

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Applies "latest profile" updates with last-timestamp-wins semantics.
///
/// Every commit is a compare-and-swap on the entity version. A lost race
/// re-reads and retries up to `max_attempts` times in total.
pub struct ProfileUpdateService {
    repository: Arc<dyn EntityRepository>,
    stale_policy: StalePolicy,
    max_attempts: u32,
}

impl ProfileUpdateService {
    pub fn new(repository: Arc<dyn EntityRepository>) -> Self {
        Self {
            repository,
            stale_policy: StalePolicy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn stale_policy(&self) -> StalePolicy {
        self.stale_policy
    }

    pub fn repository(&self) -> &Arc<dyn EntityRepository> {
        &self.repository
    }

    pub async fn update_latest_profile(
        &self,
        id: EntityId,
        profile: ProfileRecord,
    ) -> Result<UpdateOutcome, ProfileError> {
        self.update_latest_profile_with(id, profile, self.stale_policy).await
    }

    /// Same as [`update_latest_profile`](Self::update_latest_profile) with an
    /// explicit stale policy for this call.
    pub async fn update_latest_profile_with(
        &self,
        id: EntityId,
        profile: ProfileRecord,
        policy: StalePolicy,
    ) -> Result<UpdateOutcome, ProfileError> {
        for attempt in 1..=self.max_attempts {
            let current = self.repository.get(id).await?;

            if let Some(latest) = &current.latest_profile {
                if profile.timestamp <= latest.timestamp {
                    if policy == StalePolicy::Reject && !profile.is_replay_of(latest) {
                        return Err(ProfileError::StaleUpdate {
                            id,
                            timestamp: profile.timestamp,
                            latest: latest.timestamp,
                        });
                    }
                    debug!(
                        "Ignoring profile for {} at {} (latest is {})",
                        id, profile.timestamp, latest.timestamp
                    );
                    return Ok(UpdateOutcome::Unchanged(current));
                }
            }

            match self
                .repository
                .compare_and_swap_profile(id, current.version, profile.clone())
                .await
            {
                Ok(view) => {
                    info!(
                        "Updated latest profile for {} to {} (version {} -> {})",
                        id, profile.timestamp, current.version, view.version
                    );
                    return Ok(UpdateOutcome::Updated(view));
                }
                Err(RepositoryError::VersionMismatch { expected, actual, .. }) => {
                    debug!(
                        "Lost race on {} (attempt {}/{}): expected version {}, found {}",
                        id, attempt, self.max_attempts, expected, actual
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(
            "Giving up on profile update for {} after {} attempts",
            id, self.max_attempts
        );
        Err(ProfileError::ConcurrentModification {
            id,
            attempts: self.max_attempts,
        })
    }

    pub async fn get_entity(&self, id: EntityId) -> Result<EntityView, ProfileError> {
        Ok(self.repository.get(id).await?)
    }

    pub async fn latest_profile(&self, id: EntityId) -> Result<Option<ProfileRecord>, ProfileError> {
        Ok(self.repository.get(id).await?.latest_profile)
    }

    pub async fn list_profiles(
        &self,
        id: EntityId,
        range: ProfileRange,
    ) -> Result<Vec<ProfileRecord>, ProfileError> {
        Ok(self.repository.list_profiles(id, range).await?)
    }

    /// Summary derived from the latest profile, `None` when the entity has
    /// never been profiled.
    pub async fn profile_summary(&self, id: EntityId) -> Result<Option<ProfileSummary>, ProfileError> {
        let view = self.repository.get(id).await?;
        Ok(view.latest_profile.as_ref().map(ProfileSummary::from_profile))
    }
}
