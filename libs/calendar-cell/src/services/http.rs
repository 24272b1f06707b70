// libs/calendar-cell/src/services/http.rs
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{BusyInterval, CalendarError, CalendarEvent, EventWindow, NewEvent};
use crate::services::gateway::CalendarApi;

/// One bounded timeout for every provider round-trip. A timeout is surfaced
/// as `CalendarError::Timeout` so commit-side callers can fail closed.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the external calendar provider's REST surface.
/// The engine performs no automatic retries against it.
pub struct HttpCalendarClient {
    client: Client,
    base_url: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    busy: Vec<BusyInterval>,
}

#[derive(Debug, Deserialize)]
struct EventListResponse {
    items: Vec<CalendarEvent>,
}

#[derive(Debug, Serialize)]
struct EventPatch {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl HttpCalendarClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.calendar_api_base_url, &config.calendar_api_token)
    }

    pub fn with_base_url(base_url: &str, api_token: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> Result<(StatusCode, String), CalendarError> {
        debug!("Calendar request: {} {}", method, url);

        let mut req = self
            .client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json");

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                CalendarError::Timeout
            } else {
                CalendarError::Api(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CalendarError::Api(e.to_string()))?;

        Ok((status, text))
    }

    fn check_status(status: StatusCode, text: &str, subject: &str) -> Result<(), CalendarError> {
        if status == StatusCode::NOT_FOUND {
            return Err(CalendarError::EventNotFound(subject.to_string()));
        }
        if !status.is_success() {
            error!("Calendar API error ({}): {}", status, text);
            return Err(CalendarError::Api(format!("HTTP {}: {}", status, text)));
        }
        Ok(())
    }

    fn parse<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, CalendarError> {
        serde_json::from_str(text)
            .map_err(|e| CalendarError::Api(format!("unparseable provider response: {}", e)))
    }

    fn range_query(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
        format!(
            "timeMin={}&timeMax={}",
            urlencoding::encode(&from.to_rfc3339()),
            urlencoding::encode(&to.to_rfc3339()),
        )
    }
}

#[async_trait]
impl CalendarApi for HttpCalendarClient {
    async fn get_free_busy(
        &self,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        let url = format!(
            "{}/calendars/{}/freeBusy?{}",
            self.base_url,
            calendar_id,
            Self::range_query(from, to),
        );
        let (status, text) = self.send(Method::GET, &url, None).await?;
        Self::check_status(status, &text, calendar_id)?;

        let parsed: FreeBusyResponse = Self::parse(&text)?;
        Ok(parsed.busy)
    }

    async fn create_event(
        &self,
        calendar_id: &str,
        event: NewEvent,
    ) -> Result<CalendarEvent, CalendarError> {
        let url = format!("{}/calendars/{}/events", self.base_url, calendar_id);
        let body = serde_json::to_value(&event)
            .map_err(|e| CalendarError::Api(format!("unserializable event: {}", e)))?;

        let (status, text) = self.send(Method::POST, &url, Some(body)).await?;
        Self::check_status(status, &text, calendar_id)?;
        Self::parse(&text)
    }

    async fn get_event(
        &self,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<CalendarEvent, CalendarError> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url, calendar_id, event_id
        );
        let (status, text) = self.send(Method::GET, &url, None).await?;
        Self::check_status(status, &text, event_id)?;
        Self::parse(&text)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        window: EventWindow,
    ) -> Result<CalendarEvent, CalendarError> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url, calendar_id, event_id
        );
        let patch = EventPatch {
            start: window.start,
            end: window.end,
        };
        let body = serde_json::to_value(&patch)
            .map_err(|e| CalendarError::Api(format!("unserializable patch: {}", e)))?;

        let (status, text) = self.send(Method::PATCH, &url, Some(body)).await?;
        Self::check_status(status, &text, event_id)?;
        Self::parse(&text)
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url, calendar_id, event_id
        );
        let (status, text) = self.send(Method::DELETE, &url, None).await?;
        Self::check_status(status, &text, event_id)
    }

    async fn list_events_in_range(
        &self,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let url = format!(
            "{}/calendars/{}/events?{}",
            self.base_url,
            calendar_id,
            Self::range_query(from, to),
        );
        let (status, text) = self.send(Method::GET, &url, None).await?;
        Self::check_status(status, &text, calendar_id)?;

        let parsed: EventListResponse = Self::parse(&text)?;
        Ok(parsed.items)
    }

    async fn patch_private_metadata(
        &self,
        calendar_id: &str,
        event_id: &str,
        entries: HashMap<String, String>,
    ) -> Result<(), CalendarError> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url, calendar_id, event_id
        );
        let body = json!({ "private_metadata": entries });

        let (status, text) = self.send(Method::PATCH, &url, Some(body)).await?;
        Self::check_status(status, &text, event_id)
    }
}
