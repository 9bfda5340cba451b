use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub name: String,
    pub group: String,
    /// Wall-clock time of the workout as rendered by the server, `HH:MM`.
    pub hour: String,
    pub created_at: DateTime<Utc>,
}

/// One section of the history list: all workouts of a single day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryByDay {
    pub title: String,
    pub data: Vec<HistoryEntry>,
}
