pub mod app_config;
pub mod booking_repo;
pub mod catalog_repo;
pub mod database;
pub mod events;
pub mod inventory_repo;
pub mod payment_repo;
pub mod redis_repo;

pub use booking_repo::PgBookingRepository;
pub use catalog_repo::PgCatalogRepository;
pub use database::DbClient;
pub use events::EventProducer;
pub use payment_repo::PgPaymentRepository;
pub use redis_repo::RedisClient;

use aerolux_core::error::BookingError;

pub(crate) fn pg_err(e: sqlx::Error) -> BookingError {
    BookingError::Persistence(e.to_string())
}
