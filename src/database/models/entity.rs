use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::ProfileRecord;

/// Opaque catalog entity identifier. Assigned by the entity-creation workflow
/// and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for EntityId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Externally visible representation of a catalog entity (a table).
///
/// `version` is the optimistic concurrency token: every mutating write bumps
/// it by exactly one, and it never decreases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub name: String,
    pub fully_qualified_name: String,
    #[serde(default = "default_entity_type")]
    pub entity_type: String,
    pub version: i64,
    #[serde(default)]
    pub latest_profile: Option<ProfileRecord>,
    pub updated_at: DateTime<Utc>,
}

fn default_entity_type() -> String {
    "table".to_string()
}

impl EntityView {
    /// Build a fresh table entity at version 1 with no profile.
    pub fn table(id: EntityId, fully_qualified_name: impl Into<String>) -> Self {
        let fully_qualified_name = fully_qualified_name.into();
        let name = fully_qualified_name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_string();

        Self {
            id,
            name,
            fully_qualified_name,
            entity_type: default_entity_type(),
            version: 1,
            latest_profile: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn with_latest_profile(mut self, profile: ProfileRecord) -> Self {
        self.latest_profile = Some(profile);
        self
    }

    pub fn latest_profile_timestamp(&self) -> Option<i64> {
        self.latest_profile.as_ref().map(|p| p.timestamp)
    }

    /// Produce the view that a successful compare-and-swap commits, or `None`
    /// when the version cannot be incremented.
    pub fn next_with_profile(&self, profile: ProfileRecord) -> Option<Self> {
        Some(Self {
            version: self.version.checked_add(1)?,
            latest_profile: Some(profile),
            updated_at: Utc::now(),
            ..self.clone()
        })
    }
}
