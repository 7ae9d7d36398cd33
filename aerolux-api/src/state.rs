use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use aerolux_booking::{BookingService, PaymentGate};
use aerolux_core::notify::NotificationSink;
use aerolux_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
    pub payments: Arc<PaymentGate>,
    pub redis: Arc<RedisClient>,
    pub notifier: Arc<dyn NotificationSink>,
    pub auth: AuthConfig,
}

impl AppState {
    /// Fire-and-forget event publish; failures are logged, never surfaced to
    /// the request that produced the event.
    pub fn publish_event<T: Serialize>(&self, topic: &'static str, key: String, event: &T) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("failed to encode {} event: {}", topic, e);
                return;
            }
        };
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.publish(topic, &key, &payload).await {
                tracing::error!("failed to publish {} event: {}", topic, e);
            }
        });
    }

    /// Drop the cached availability count for a flight after its seat counter
    /// moved; the search path re-seeds the cache from the database.
    pub fn invalidate_flight_cache(&self, flight_id: Uuid) {
        let redis = self.redis.clone();
        tokio::spawn(async move {
            if let Err(e) = redis
                .delete_flight_availability(&flight_id.to_string())
                .await
            {
                tracing::warn!("failed to invalidate availability cache: {}", e);
            }
        });
    }
}
