use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A time-bounded event with a fixed participant capacity.
///
/// `participants` holds user ids and is mutated only through the
/// participation manager; `version` is bumped on every write and backs the
/// conditional participant update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// 0 means unlimited.
    pub capacity: u32,
    pub participants: BTreeSet<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

impl Event {
    /// Closed-interval overlap test: a touching endpoint counts as overlap.
    pub fn overlaps(&self, range_start: DateTime<Utc>, range_end: DateTime<Utc>) -> bool {
        self.start_time <= range_end && self.end_time >= range_start
    }

    /// True when the event has a capacity ceiling and it is reached.
    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.participants.len() as u32 >= self.capacity
    }
}

/// Mutable event fields, used for both creation and full-field updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: u32,
}

/// Reduced event view for listings: participant ids are replaced by
/// usernames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: u32,
    pub participants: Vec<String>,
}

/// Outcome of a participation toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationChange {
    Joined,
    Left,
}
