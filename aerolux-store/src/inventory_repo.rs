use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use aerolux_core::error::{BookingError, BookingResult};

use crate::pg_err;

#[derive(sqlx::FromRow)]
struct FlightGuardRow {
    seats_available: i32,
    scheduled_departure: DateTime<Utc>,
}

/// Seat-count mutations for flights. Both operations are single conditional
/// statements so the precondition and the write land in one atomic step;
/// they run inside the caller's transaction, paired with the booking write.
/// A room-level ledger for hotels would sit alongside this type.
pub struct SeatInventory;

impl SeatInventory {
    pub async fn reserve(
        tx: &mut Transaction<'_, Postgres>,
        flight_id: Uuid,
        seats: i32,
    ) -> BookingResult<()> {
        let res = sqlx::query(
            r#"
            UPDATE flights
            SET seats_available = seats_available - $2, updated_at = NOW()
            WHERE id = $1 AND seats_available >= $2 AND scheduled_departure > NOW()
            "#,
        )
        .bind(flight_id)
        .bind(seats)
        .execute(&mut **tx)
        .await
        .map_err(pg_err)?;

        if res.rows_affected() == 1 {
            return Ok(());
        }

        // The guarded update matched nothing; look at the row to say why.
        let row = sqlx::query_as::<_, FlightGuardRow>(
            "SELECT seats_available, scheduled_departure FROM flights WHERE id = $1",
        )
        .bind(flight_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(pg_err)?;

        match row {
            None => Err(BookingError::not_found("flight", flight_id)),
            Some(f) if f.scheduled_departure <= Utc::now() => Err(BookingError::InvalidState(
                format!("flight {} has already departed", flight_id),
            )),
            Some(f) => Err(BookingError::InventoryUnavailable {
                requested: seats,
                available: f.seats_available,
            }),
        }
    }

    /// Increment clipped at capacity. Callers only release counts they
    /// previously reserved; the clip is a safety net.
    pub async fn release(
        tx: &mut Transaction<'_, Postgres>,
        flight_id: Uuid,
        seats: i32,
    ) -> BookingResult<()> {
        let res = sqlx::query(
            r#"
            UPDATE flights
            SET seats_available = LEAST(capacity, seats_available + $2), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(flight_id)
        .bind(seats)
        .execute(&mut **tx)
        .await
        .map_err(pg_err)?;

        if res.rows_affected() == 0 {
            return Err(BookingError::not_found("flight", flight_id));
        }
        Ok(())
    }
}
