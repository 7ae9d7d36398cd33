use async_trait::async_trait;

/// Fire-and-forget event sink (Kafka in production). Callers must never let
/// a publish failure propagate into the surrounding unit of work.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
