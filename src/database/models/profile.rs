use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A timestamped statistics snapshot attached to an entity.
///
/// The payload is semi-structured profiler output and is stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub timestamp: i64,
    pub payload: Value,
}

impl ProfileRecord {
    pub fn new(timestamp: i64, payload: Value) -> Self {
        Self { timestamp, payload }
    }

    /// Same timestamp and same payload: a replay of an already applied update.
    pub fn is_replay_of(&self, other: &ProfileRecord) -> bool {
        self.timestamp == other.timestamp && self.payload == other.payload
    }
}

/// Inclusive timestamp window used when reading profile history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileRange {
    pub start_ts: Option<i64>,
    pub end_ts: Option<i64>,
}

impl ProfileRange {
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start_ts.map_or(true, |start| timestamp >= start)
            && self.end_ts.map_or(true, |end| timestamp <= end)
    }

    pub fn is_inverted(&self) -> bool {
        matches!((self.start_ts, self.end_ts), (Some(s), Some(e)) if s > e)
    }
}
