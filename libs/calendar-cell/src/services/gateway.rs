// libs/calendar-cell/src/services/gateway.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;

use crate::models::{BusyInterval, CalendarError, CalendarEvent, EventWindow, NewEvent};

/// Boundary to the external calendar provider. This is the single shared
/// mutable resource of the booking engine, so busy intervals are always
/// fetched fresh per call and never cached here or by callers.
#[automock]
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Busy intervals on `calendar_id` inside `[from, to)`.
    async fn get_free_busy(
        &self,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CalendarError>;

    async fn create_event(
        &self,
        calendar_id: &str,
        event: NewEvent,
    ) -> Result<CalendarEvent, CalendarError>;

    async fn get_event(
        &self,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<CalendarEvent, CalendarError>;

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        window: EventWindow,
    ) -> Result<CalendarEvent, CalendarError>;

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError>;

    async fn list_events_in_range(
        &self,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;

    /// Merge `entries` into the event's private key/value metadata without
    /// touching the event window or description.
    async fn patch_private_metadata(
        &self,
        calendar_id: &str,
        event_id: &str,
        entries: HashMap<String, String>,
    ) -> Result<(), CalendarError>;
}
