// libs/booking-cell/src/services/intake.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mockall::automock;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::DatastoreClient;

use crate::models::{BookingIntake, FollowUpPlan, IntakeStatus};

#[automock]
#[async_trait]
pub trait IntakeStore: Send + Sync {
    async fn create_intake(&self, intake: &BookingIntake) -> anyhow::Result<()>;

    async fn set_status(
        &self,
        intake_id: Uuid,
        status: IntakeStatus,
        event_id: Option<String>,
    ) -> anyhow::Result<()>;

    async fn update_window(
        &self,
        intake_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    async fn find_by_event(&self, event_id: &str) -> anyhow::Result<Option<BookingIntake>>;

    async fn list_by_patient_email(&self, email: &str) -> anyhow::Result<Vec<BookingIntake>>;

    /// Pending follow-up plans for the patient with `suggested_date` within
    /// `window_days` of `around`, earliest first.
    async fn pending_follow_ups_near(
        &self,
        patient_email: &str,
        around: NaiveDate,
        window_days: i64,
    ) -> anyhow::Result<Vec<FollowUpPlan>>;

    async fn mark_follow_up_booked(&self, plan_id: Uuid, event_id: &str) -> anyhow::Result<()>;
}

pub struct PostgrestIntakeStore {
    store: Arc<DatastoreClient>,
}

impl PostgrestIntakeStore {
    pub fn new(store: Arc<DatastoreClient>) -> Self {
        Self { store }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }
}

#[async_trait]
impl IntakeStore for PostgrestIntakeStore {
    async fn create_intake(&self, intake: &BookingIntake) -> anyhow::Result<()> {
        let body = serde_json::to_value(intake)?;
        let created: Vec<Value> = self
            .store
            .request_with_headers(
                Method::POST,
                "/rest/v1/booking_intakes",
                Some(body),
                Some(Self::representation_headers()),
            )
            .await?;

        if created.is_empty() {
            anyhow::bail!("intake row was not created");
        }
        Ok(())
    }

    async fn set_status(
        &self,
        intake_id: Uuid,
        status: IntakeStatus,
        event_id: Option<String>,
    ) -> anyhow::Result<()> {
        let mut update = serde_json::Map::new();
        update.insert("status".to_string(), json!(status));
        if let Some(event_id) = event_id {
            update.insert("event_id".to_string(), json!(event_id));
        }
        update.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/booking_intakes?id=eq.{}", intake_id);
        let _: Vec<Value> = self
            .store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(Value::Object(update)),
                Some(Self::representation_headers()),
            )
            .await?;
        Ok(())
    }

    async fn update_window(
        &self,
        intake_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let update = json!({
            "starts_at": starts_at.to_rfc3339(),
            "ends_at": ends_at.to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let path = format!("/rest/v1/booking_intakes?id=eq.{}", intake_id);
        let _: Vec<Value> = self
            .store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(update),
                Some(Self::representation_headers()),
            )
            .await?;
        Ok(())
    }

    async fn find_by_event(&self, event_id: &str) -> anyhow::Result<Option<BookingIntake>> {
        let path = format!(
            "/rest/v1/booking_intakes?event_id=eq.{}",
            urlencoding::encode(event_id)
        );
        let rows: Vec<Value> = self.store.request(Method::GET, &path, None).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    async fn list_by_patient_email(&self, email: &str) -> anyhow::Result<Vec<BookingIntake>> {
        let path = format!(
            "/rest/v1/booking_intakes?patient_email=eq.{}&order=starts_at.desc",
            urlencoding::encode(email)
        );
        let rows: Vec<Value> = self.store.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(Into::into))
            .collect()
    }

    async fn pending_follow_ups_near(
        &self,
        patient_email: &str,
        around: NaiveDate,
        window_days: i64,
    ) -> anyhow::Result<Vec<FollowUpPlan>> {
        let from = around - chrono::Duration::days(window_days);
        let to = around + chrono::Duration::days(window_days);
        let path = format!(
            "/rest/v1/follow_up_plans?patient_email=eq.{}&status=eq.pending&suggested_date=gte.{}&suggested_date=lte.{}&order=suggested_date.asc",
            urlencoding::encode(patient_email),
            from,
            to,
        );
        let rows: Vec<Value> = self.store.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(Into::into))
            .collect()
    }

    async fn mark_follow_up_booked(&self, plan_id: Uuid, event_id: &str) -> anyhow::Result<()> {
        let update = json!({
            "status": "booked",
            "event_id": event_id,
        });

        // Scoped to status=pending so a concurrently adopted plan is not
        // overwritten.
        let path = format!("/rest/v1/follow_up_plans?id=eq.{}&status=eq.pending", plan_id);
        let _: Vec<Value> = self
            .store
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(update),
                Some(Self::representation_headers()),
            )
            .await?;
        Ok(())
    }
}
