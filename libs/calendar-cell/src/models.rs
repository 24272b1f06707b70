// libs/calendar-cell/src/models.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A time range the external calendar reports as occupied. Provider-owned
/// and opaque: the engine never learns which event produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    /// Half-open overlap test: `[start, end)` against `[other_start, other_end)`.
    /// A window ending exactly where a busy interval begins does not overlap.
    pub fn overlaps(&self, other_start: DateTime<Utc>, other_end: DateTime<Utc>) -> bool {
        other_start < self.end && other_end > self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: EventStatus,
    #[serde(default)]
    pub private_metadata: HashMap<String, String>,
}

impl CalendarEvent {
    pub fn window(&self) -> EventWindow {
        EventWindow {
            start: self.start,
            end: self.end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

/// Calendar provider failures. The engine never retries these itself;
/// callers decide per their own fail-open/fail-closed policy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar request timed out")]
    Timeout,

    #[error("calendar event not found: {0}")]
    EventNotFound(String),

    #[error("calendar api error: {0}")]
    Api(String),
}
