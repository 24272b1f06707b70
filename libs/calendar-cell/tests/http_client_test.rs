use std::collections::HashMap;

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use calendar_cell::{CalendarApi, CalendarError, EventWindow, HttpCalendarClient, NewEvent};

fn client_for(server: &MockServer) -> HttpCalendarClient {
    HttpCalendarClient::with_base_url(&server.uri(), "test-token")
}

#[tokio::test]
async fn free_busy_parses_intervals() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendars/cal-1/freeBusy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "busy": [
                { "start": "2026-03-02T01:00:00Z", "end": "2026-03-02T01:30:00Z" },
                { "start": "2026-03-02T04:00:00Z", "end": "2026-03-02T05:00:00Z" }
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let from = Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap();

    let busy = client.get_free_busy("cal-1", from, to).await.unwrap();
    assert_eq!(busy.len(), 2);
    assert_eq!(busy[0].end, Utc.with_ymd_and_hms(2026, 3, 2, 1, 30, 0).unwrap());
}

#[tokio::test]
async fn free_busy_sends_range_as_query_params() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendars/cal-1/freeBusy"))
        .and(query_param("timeMin", "2026-03-01T15:00:00+00:00"))
        .and(query_param("timeMax", "2026-03-02T15:00:00+00:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "busy": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let from = Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap();

    client.get_free_busy("cal-1", from, to).await.unwrap();
}

#[tokio::test]
async fn create_event_posts_and_returns_event() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/calendars/cal-1/events"))
        .and(body_partial_json(json!({ "summary": "Appointment" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "evt-42",
            "summary": "Appointment",
            "description": "v1\n",
            "start": "2026-03-02T01:00:00Z",
            "end": "2026-03-02T01:30:00Z",
            "status": "confirmed",
            "private_metadata": {}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let event = client
        .create_event(
            "cal-1",
            NewEvent {
                summary: "Appointment".to_string(),
                description: "v1\n".to_string(),
                start: Utc.with_ymd_and_hms(2026, 3, 2, 1, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2026, 3, 2, 1, 30, 0).unwrap(),
            },
        )
        .await
        .unwrap();

    assert_eq!(event.id, "evt-42");
}

#[tokio::test]
async fn missing_event_maps_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendars/cal-1/events/evt-missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.get_event("cal-1", "evt-missing").await;
    assert_matches!(result, Err(CalendarError::EventNotFound(id)) if id == "evt-missing");
}

#[tokio::test]
async fn provider_failure_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/calendars/cal-1/events/evt-1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let window = EventWindow {
        start: Utc.with_ymd_and_hms(2026, 3, 2, 1, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2026, 3, 2, 1, 30, 0).unwrap(),
    };
    let result = client.update_event("cal-1", "evt-1", window).await;
    assert_matches!(result, Err(CalendarError::Api(_)));
}

#[tokio::test]
async fn metadata_patch_sends_private_entries() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/calendars/cal-1/events/evt-1"))
        .and(body_partial_json(json!({
            "private_metadata": { "reminder_sent_at": "2026-03-01T09:00:00+00:00" }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut entries = HashMap::new();
    entries.insert(
        "reminder_sent_at".to_string(),
        "2026-03-01T09:00:00+00:00".to_string(),
    );

    client
        .patch_private_metadata("cal-1", "evt-1", entries)
        .await
        .unwrap();
}

#[tokio::test]
async fn list_events_parses_items() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendars/cal-1/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "evt-7",
                "summary": "Appointment",
                "description": null,
                "start": "2026-03-03T02:00:00Z",
                "end": "2026-03-03T02:30:00Z",
                "status": "cancelled"
            }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let from = Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2026, 3, 3, 15, 0, 0).unwrap();
    let events = client.list_events_in_range("cal-1", from, to).await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, calendar_cell::EventStatus::Cancelled);
    assert!(events[0].private_metadata.is_empty());
}
