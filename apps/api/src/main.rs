use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use availability_cell::handlers::AvailabilityState;
use availability_cell::{
    HolidayResolver, PostgrestHolidayStore, PostgrestScheduleStore, ScheduleRepository,
    SlotGenerator, SystemClock,
};
use booking_cell::handlers::BookingState;
use booking_cell::{BookingCoordinator, PostgrestIntakeStore, WebhookNotifier};
use calendar_cell::HttpCalendarClient;
use reminder_cell::handlers::ReminderState;
use reminder_cell::ReminderSweeper;
use shared_config::AppConfig;
use shared_database::DatastoreClient;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting booking engine API server");

    // Load configuration
    let config = AppConfig::from_env();
    if !config.is_configured() {
        warn!("Datastore or calendar configuration is incomplete, external calls will fail");
    }

    let timezone: Tz = config.clinic_timezone.parse().unwrap_or_else(|_| {
        warn!(
            "Unrecognized clinic timezone {:?}, falling back to UTC",
            config.clinic_timezone
        );
        chrono_tz::UTC
    });

    // Shared external clients
    let datastore = Arc::new(DatastoreClient::new(&config));
    let calendar = Arc::new(HttpCalendarClient::new(&config));
    let notifier = Arc::new(WebhookNotifier::new(&config));

    let schedules = Arc::new(ScheduleRepository::new(
        Arc::new(PostgrestScheduleStore::new(datastore.clone())),
        Arc::new(SystemClock),
        Duration::from_secs(config.schedule_cache_ttl_secs),
    ));
    let holidays = Arc::new(HolidayResolver::new(Arc::new(PostgrestHolidayStore::new(
        datastore.clone(),
    ))));
    let intakes = Arc::new(PostgrestIntakeStore::new(datastore.clone()));

    let availability_state = Arc::new(AvailabilityState {
        slots: SlotGenerator::new(
            schedules.clone(),
            holidays.clone(),
            calendar.clone(),
            timezone,
        ),
    });
    let booking_state = Arc::new(BookingState {
        coordinator: BookingCoordinator::new(
            schedules.clone(),
            calendar.clone(),
            intakes.clone(),
            notifier.clone(),
            timezone,
        ),
        intakes: intakes.clone(),
    });
    let reminder_state = Arc::new(ReminderState {
        sweeper: ReminderSweeper::new(schedules.clone(), calendar.clone(), notifier.clone()),
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(availability_state, booking_state, reminder_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
