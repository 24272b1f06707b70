// libs/availability-cell/src/services/schedule.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveTime;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use mockall::automock;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use shared_database::DatastoreClient;

use crate::models::{
    DayOpenRanges, ScheduleMapping, TimeRange, WeeklySchedule, KNOWN_CLINIC_IDS, KNOWN_DOCTOR_IDS,
};

/// Time source for cache expiry, injected so tests control it.
#[automock]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[automock]
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn load_active_mappings(&self) -> anyhow::Result<Vec<ScheduleMapping>>;
}

pub struct PostgrestScheduleStore {
    store: Arc<DatastoreClient>,
}

impl PostgrestScheduleStore {
    pub fn new(store: Arc<DatastoreClient>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ScheduleStore for PostgrestScheduleStore {
    async fn load_active_mappings(&self) -> anyhow::Result<Vec<ScheduleMapping>> {
        let path = "/rest/v1/schedule_mappings?is_active=eq.true&order=doctor_id.asc,clinic_id.asc";
        let rows: Vec<Value> = self.store.request(Method::GET, path, None).await?;

        let mappings = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ScheduleMapping>, _>>()?;

        Ok(mappings)
    }
}

type MappingSet = Arc<HashMap<(String, String), ScheduleMapping>>;
type LoadFuture = Shared<BoxFuture<'static, MappingSet>>;

struct CacheState {
    loaded_at: Option<Instant>,
    generation: u64,
    mappings: MappingSet,
    inflight: Option<(u64, LoadFuture)>,
}

/// Read-through cache over the schedule mapping store.
///
/// Concurrent lookups during a miss collapse into one shared in-flight load
/// per cache generation; on storage failure or an empty result the bundled
/// fallback set is served instead, so availability degrades rather than
/// going dark.
pub struct ScheduleRepository {
    store: Arc<dyn ScheduleStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl ScheduleRepository {
    pub fn new(store: Arc<dyn ScheduleStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            state: Mutex::new(CacheState {
                loaded_at: None,
                generation: 0,
                mappings: Arc::new(HashMap::new()),
                inflight: None,
            }),
        }
    }

    /// Resolve a (practitioner, location) pair to its usable mapping.
    /// Unknown identifiers return `None` without a storage call.
    pub async fn get_schedule_mapping(
        &self,
        doctor_id: &str,
        clinic_id: &str,
    ) -> Option<ScheduleMapping> {
        if !is_known_doctor(doctor_id) || !is_known_clinic(clinic_id) {
            debug!("Unknown identifier pair ({}, {})", doctor_id, clinic_id);
            return None;
        }

        let mappings = self.current_mappings().await;
        mappings
            .get(&(doctor_id.to_string(), clinic_id.to_string()))
            .filter(|m| m.is_usable())
            .cloned()
    }

    /// Distinct calendar identifiers across all usable mappings, sorted.
    pub async fn active_calendar_ids(&self) -> Vec<String> {
        let mappings = self.current_mappings().await;
        let mut ids: Vec<String> = mappings
            .values()
            .filter(|m| m.is_usable())
            .map(|m| m.calendar_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    async fn current_mappings(&self) -> MappingSet {
        let (generation, load) = {
            let mut state = self.state.lock().await;

            if let Some(at) = state.loaded_at {
                if self.clock.now().duration_since(at) < self.ttl {
                    return Arc::clone(&state.mappings);
                }
            }

            match &state.inflight {
                Some((gen, fut)) => (*gen, fut.clone()),
                None => {
                    let generation = state.generation + 1;
                    let store = Arc::clone(&self.store);
                    let fut: LoadFuture = async move { load_or_fallback(store).await }
                        .boxed()
                        .shared();
                    state.inflight = Some((generation, fut.clone()));
                    (generation, fut)
                }
            }
        };

        let mappings = load.await;

        let mut state = self.state.lock().await;
        if state
            .inflight
            .as_ref()
            .map(|(gen, _)| *gen == generation)
            .unwrap_or(false)
        {
            state.inflight = None;
            state.generation = generation;
            state.loaded_at = Some(self.clock.now());
            state.mappings = Arc::clone(&mappings);
        }

        mappings
    }
}

async fn load_or_fallback(store: Arc<dyn ScheduleStore>) -> MappingSet {
    let mappings = match store.load_active_mappings().await {
        Ok(rows) if !rows.is_empty() => rows,
        Ok(_) => {
            warn!("Schedule mapping load returned no rows, serving bundled fallback");
            fallback_mappings()
        }
        Err(e) => {
            warn!("Schedule mapping load failed ({}), serving bundled fallback", e);
            fallback_mappings()
        }
    };

    let usable = mappings
        .into_iter()
        .filter(|m| match m.weekly_schedule.validate() {
            Ok(()) => true,
            Err(reason) => {
                warn!(
                    "Dropping mapping ({}, {}) with invalid schedule: {}",
                    m.doctor_id, m.clinic_id, reason
                );
                false
            }
        })
        .map(|m| ((m.doctor_id.clone(), m.clinic_id.clone()), m))
        .collect();

    Arc::new(usable)
}

pub fn is_known_doctor(doctor_id: &str) -> bool {
    KNOWN_DOCTOR_IDS.contains(&doctor_id)
}

pub fn is_known_clinic(clinic_id: &str) -> bool {
    KNOWN_CLINIC_IDS.contains(&clinic_id)
}

/// Static bundled mapping set served when the datastore is unreachable or
/// empty. Weekday mornings and afternoons at the main clinic, Saturday
/// mornings only; dr-costa also covers the north clinic.
pub fn fallback_mappings() -> Vec<ScheduleMapping> {
    let mut mappings: Vec<ScheduleMapping> = KNOWN_DOCTOR_IDS
        .iter()
        .map(|doctor| ScheduleMapping {
            doctor_id: doctor.to_string(),
            clinic_id: "main-clinic".to_string(),
            calendar_id: format!("cal-{}-main", doctor.trim_start_matches("dr-")),
            weekly_schedule: default_weekly_schedule(),
            is_active: true,
        })
        .collect();

    mappings.push(ScheduleMapping {
        doctor_id: "dr-costa".to_string(),
        clinic_id: "north-clinic".to_string(),
        calendar_id: "cal-costa-north".to_string(),
        weekly_schedule: default_weekly_schedule(),
        is_active: true,
    });

    mappings
}

fn default_weekly_schedule() -> WeeklySchedule {
    let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).expect("valid wall-clock time");
    let weekday = vec![
        TimeRange { start: hm(9, 0), end: hm(12, 0) },
        TimeRange { start: hm(14, 0), end: hm(17, 0) },
    ];
    let saturday = vec![TimeRange { start: hm(9, 0), end: hm(12, 0) }];

    WeeklySchedule(
        (1..=5u8)
            .map(|day| DayOpenRanges { day_of_week: day, ranges: weekday.clone() })
            .chain(std::iter::once(DayOpenRanges { day_of_week: 6, ranges: saturday }))
            .collect(),
    )
}
