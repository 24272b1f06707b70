// libs/booking-cell/src/services/notify.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ConfirmationMessage {
    pub patient_name: String,
    pub patient_email: String,
    pub doctor_id: String,
    pub clinic_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReminderMessage {
    pub patient_name: String,
    pub patient_email: String,
    pub doctor_id: String,
    pub clinic_id: String,
    pub starts_at: DateTime<Utc>,
}

#[automock]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_confirmation(&self, message: &ConfirmationMessage) -> anyhow::Result<()>;
    async fn send_reminder(&self, message: &ReminderMessage) -> anyhow::Result<()>;
}

/// Posts notification payloads to an external webhook. When no webhook URL
/// is configured every send fails, which keeps the reminder sweeper from
/// flagging events whose reminder never left the building.
pub struct WebhookNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(config: &shared_config::AppConfig) -> Self {
        let url = config
            .is_notifier_configured()
            .then(|| config.notifier_webhook_url.clone());
        Self::with_webhook_url(url)
    }

    pub fn with_webhook_url(webhook_url: Option<String>) -> Self {
        let webhook_url = webhook_url.filter(|url| !url.is_empty());
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            webhook_url,
        }
    }

    async fn post(&self, payload: serde_json::Value) -> anyhow::Result<()> {
        let url = self
            .webhook_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("notifier webhook URL is not configured"))?;

        let response = self.client.post(url).json(&payload).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("notifier webhook returned {}", response.status());
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_confirmation(&self, message: &ConfirmationMessage) -> anyhow::Result<()> {
        debug!(email = %message.patient_email, "Sending booking confirmation");
        self.post(json!({
            "kind": "booking_confirmation",
            "patient_name": message.patient_name,
            "patient_email": message.patient_email,
            "doctor_id": message.doctor_id,
            "clinic_id": message.clinic_id,
            "starts_at": message.starts_at.to_rfc3339(),
            "ends_at": message.ends_at.to_rfc3339(),
        }))
        .await
    }

    async fn send_reminder(&self, message: &ReminderMessage) -> anyhow::Result<()> {
        debug!(email = %message.patient_email, "Sending appointment reminder");
        self.post(json!({
            "kind": "appointment_reminder",
            "patient_name": message.patient_name,
            "patient_email": message.patient_email,
            "doctor_id": message.doctor_id,
            "clinic_id": message.clinic_id,
            "starts_at": message.starts_at.to_rfc3339(),
        }))
        .await
    }
}
