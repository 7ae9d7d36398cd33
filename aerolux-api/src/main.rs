use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use aerolux_api::{
    app,
    state::{AppState, AuthConfig},
};
use aerolux_booking::{BookingService, CancellationScheduler, PaymentGate};
use aerolux_core::clock::{Clock, SystemClock};
use aerolux_core::notify::NotificationSink;
use aerolux_core::repository::{BookingRepository, CatalogRepository, PaymentRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aerolux_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = aerolux_store::app_config::Config::load()?;
    tracing::info!("Starting AeroLux API on port {}", config.server.port);

    let db = aerolux_store::DbClient::new(&config.database.url).await?;
    db.migrate().await?;

    let redis = Arc::new(aerolux_store::RedisClient::new(&config.redis.url).await?);
    let kafka = Arc::new(aerolux_store::EventProducer::new(&config.kafka.brokers)?);

    let booking_repo: Arc<dyn BookingRepository> =
        Arc::new(aerolux_store::PgBookingRepository::new(db.pool.clone()));
    let catalog: Arc<dyn CatalogRepository> =
        Arc::new(aerolux_store::PgCatalogRepository::new(db.pool.clone()));
    let payment_repo: Arc<dyn PaymentRepository> =
        Arc::new(aerolux_store::PgPaymentRepository::new(db.pool.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let booking_service = Arc::new(BookingService::new(
        booking_repo.clone(),
        catalog,
        clock.clone(),
    ));
    let payment_gate = Arc::new(PaymentGate::new(
        payment_repo,
        booking_repo.clone(),
        clock.clone(),
    ));

    let scheduler = CancellationScheduler::new(
        booking_repo,
        clock,
        Duration::from_secs(config.scheduler.sweep_interval_seconds),
    )
    .with_notifier(kafka.clone() as Arc<dyn NotificationSink>);
    let scheduler_handle = scheduler.start();

    let app_state = AppState {
        bookings: booking_service,
        payments: payment_gate,
        redis,
        notifier: kafka,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.into_inner(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Stop the sweep only after the HTTP surface has drained.
    scheduler_handle.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
