use std::env;
use tracing::warn;

/// Bounds for the schedule mapping cache TTL. Values outside this window are
/// clamped rather than rejected so a bad env var cannot disable caching or
/// pin stale schedules for hours.
pub const SCHEDULE_CACHE_TTL_MIN_SECS: u64 = 5;
pub const SCHEDULE_CACHE_TTL_MAX_SECS: u64 = 1800;
pub const SCHEDULE_CACHE_TTL_DEFAULT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub datastore_url: String,
    pub datastore_api_key: String,
    pub calendar_api_base_url: String,
    pub calendar_api_token: String,
    pub notifier_webhook_url: String,
    pub clinic_timezone: String,
    pub schedule_cache_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            datastore_url: env::var("DATASTORE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATASTORE_URL not set, using empty value");
                    String::new()
                }),
            datastore_api_key: env::var("DATASTORE_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("DATASTORE_API_KEY not set, using empty value");
                    String::new()
                }),
            calendar_api_base_url: env::var("CALENDAR_API_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("CALENDAR_API_BASE_URL not set, using empty value");
                    String::new()
                }),
            calendar_api_token: env::var("CALENDAR_API_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("CALENDAR_API_TOKEN not set, using empty value");
                    String::new()
                }),
            notifier_webhook_url: env::var("NOTIFIER_WEBHOOK_URL")
                .unwrap_or_else(|_| {
                    warn!("NOTIFIER_WEBHOOK_URL not set, using empty value");
                    String::new()
                }),
            clinic_timezone: env::var("CLINIC_TIMEZONE")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_TIMEZONE not set, using default Asia/Tokyo");
                    "Asia/Tokyo".to_string()
                }),
            schedule_cache_ttl_secs: parse_cache_ttl(env::var("SCHEDULE_CACHE_TTL_SECS").ok()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.datastore_url.is_empty()
            && !self.datastore_api_key.is_empty()
            && !self.calendar_api_base_url.is_empty()
            && !self.calendar_api_token.is_empty()
    }

    pub fn is_notifier_configured(&self) -> bool {
        !self.notifier_webhook_url.is_empty()
    }
}

fn parse_cache_ttl(raw: Option<String>) -> u64 {
    let parsed = match raw {
        Some(value) => match value.parse::<u64>() {
            Ok(secs) => secs,
            Err(_) => {
                warn!("SCHEDULE_CACHE_TTL_SECS is not a number, using default");
                SCHEDULE_CACHE_TTL_DEFAULT_SECS
            }
        },
        None => SCHEDULE_CACHE_TTL_DEFAULT_SECS,
    };

    parsed.clamp(SCHEDULE_CACHE_TTL_MIN_SECS, SCHEDULE_CACHE_TTL_MAX_SECS)
}
