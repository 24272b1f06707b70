// libs/availability-cell/src/services/holiday.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::automock;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use shared_database::DatastoreClient;

use crate::models::HolidayBlock;

#[automock]
#[async_trait]
pub trait HolidayStore: Send + Sync {
    async fn blocks_for_date(&self, date: NaiveDate) -> anyhow::Result<Vec<HolidayBlock>>;
}

pub struct PostgrestHolidayStore {
    store: Arc<DatastoreClient>,
}

impl PostgrestHolidayStore {
    pub fn new(store: Arc<DatastoreClient>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HolidayStore for PostgrestHolidayStore {
    async fn blocks_for_date(&self, date: NaiveDate) -> anyhow::Result<Vec<HolidayBlock>> {
        let path = format!(
            "/rest/v1/holiday_blocks?date=eq.{}&order=start_time.asc.nullsfirst",
            date
        );
        let rows: Vec<Value> = self.store.request(Method::GET, &path, None).await?;

        let blocks = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<HolidayBlock>, _>>()?;

        Ok(blocks)
    }
}

/// Resolves whether a date is wholly or partially blocked for a
/// practitioner/location pair, independent of the weekly schedule.
///
/// Policy is fail-open: if the holiday store is unreachable the date is
/// treated as unblocked. Clinics prefer the occasional double-booking risk
/// over blanket unavailability, and that decision is made here once rather
/// than at each call site.
pub struct HolidayResolver {
    store: Arc<dyn HolidayStore>,
}

impl HolidayResolver {
    pub fn new(store: Arc<dyn HolidayStore>) -> Self {
        Self { store }
    }

    pub async fn get_applicable_blocks(
        &self,
        date: NaiveDate,
        doctor_id: &str,
        clinic_id: &str,
    ) -> Vec<HolidayBlock> {
        match self.store.blocks_for_date(date).await {
            Ok(blocks) => {
                let applicable: Vec<HolidayBlock> = blocks
                    .into_iter()
                    .filter(|b| b.applies_to(doctor_id, clinic_id))
                    .collect();
                debug!(
                    "{} holiday block(s) apply to ({}, {}) on {}",
                    applicable.len(),
                    doctor_id,
                    clinic_id,
                    date
                );
                applicable
            }
            Err(e) => {
                warn!(
                    "Holiday lookup failed for {} ({}); treating date as unblocked",
                    date, e
                );
                Vec::new()
            }
        }
    }
}

/// A date is fully closed if any applicable block carries no time bounds,
/// regardless of how many partial blocks also exist.
pub fn has_full_day_block(blocks: &[HolidayBlock]) -> bool {
    blocks.iter().any(|b| b.is_full_day())
}
