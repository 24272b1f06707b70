// libs/reminder-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Private-metadata key stamped on an event once its reminder is delivered.
/// The flag lives on the event itself so repeated or overlapping sweeps
/// converge without coordination.
pub const REMINDER_FLAG_KEY: &str = "reminder_sent_at";

pub const DEFAULT_WINDOW_HOURS_AHEAD: i64 = 24;
pub const DEFAULT_TOLERANCE_HOURS: i64 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct SweepParams {
    /// How far ahead of now the reminder window is centered, in hours.
    #[serde(default = "default_window_hours")]
    pub window_hours_ahead: i64,
    /// Half-width of the window, so drifting sweep schedules still cover
    /// every event exactly once.
    #[serde(default = "default_tolerance_hours")]
    pub tolerance_hours: i64,
    /// When set, report what would be sent without sending or flagging.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for SweepParams {
    fn default() -> Self {
        Self {
            window_hours_ahead: DEFAULT_WINDOW_HOURS_AHEAD,
            tolerance_hours: DEFAULT_TOLERANCE_HOURS,
            dry_run: false,
        }
    }
}

fn default_window_hours() -> i64 {
    DEFAULT_WINDOW_HOURS_AHEAD
}

fn default_tolerance_hours() -> i64 {
    DEFAULT_TOLERANCE_HOURS
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub sent: usize,
    pub skipped_flagged: usize,
    pub skipped_cancelled: usize,
    pub skipped_unparseable: usize,
    pub failures: usize,
    pub dry_run: bool,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl SweepReport {
    pub fn empty(dry_run: bool, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> Self {
        Self {
            scanned: 0,
            sent: 0,
            skipped_flagged: 0,
            skipped_cancelled: 0,
            skipped_unparseable: 0,
            failures: 0,
            dry_run,
            window_start,
            window_end,
        }
    }
}
