use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use aerolux_core::catalog::{Flight, Hotel};
use aerolux_core::error::BookingResult;
use aerolux_core::repository::CatalogRepository;

use crate::pg_err;

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_number: String,
    capacity: i32,
    seats_available: i32,
    scheduled_departure: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct HotelRow {
    id: Uuid,
    name: String,
    city: Option<String>,
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn get_flight(&self, id: Uuid) -> BookingResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(
            "SELECT id, flight_number, capacity, seats_available, scheduled_departure \
             FROM flights WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(pg_err)?;

        Ok(row.map(|f| Flight {
            id: f.id,
            flight_number: f.flight_number,
            capacity: f.capacity,
            seats_available: f.seats_available,
            scheduled_departure: f.scheduled_departure,
        }))
    }

    async fn get_hotel(&self, id: Uuid) -> BookingResult<Option<Hotel>> {
        let row = sqlx::query_as::<_, HotelRow>("SELECT id, name, city FROM hotels WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?;

        Ok(row.map(|h| Hotel {
            id: h.id,
            name: h.name,
            city: h.city,
        }))
    }
}
