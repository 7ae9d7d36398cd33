use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use aerolux_core::booking::{Booking, BookingKind, BookingStatus, PaymentState, RefundStatus};
use aerolux_core::error::{BookingError, BookingResult};
use aerolux_core::repository::BookingRepository;

use crate::inventory_repo::SeatInventory;
use crate::pg_err;

const BOOKING_COLUMNS: &str = "id, user_id, kind, reference_code, travel_date, amount, currency, \
     description, status, payment_status, flight_id, passengers, hotel_id, metadata, \
     cancel_requested_at, cancellation_effective_at, refund_status, refund_amount, refunded_at, \
     created_at, updated_at";

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: Uuid) -> BookingResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(pg_err)?;

        row.map(BookingRow::into_domain).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    reference_code: String,
    travel_date: DateTime<Utc>,
    amount: i32,
    currency: String,
    description: Option<String>,
    status: String,
    payment_status: String,
    flight_id: Option<Uuid>,
    passengers: Option<i32>,
    hotel_id: Option<Uuid>,
    metadata: serde_json::Value,
    cancel_requested_at: Option<DateTime<Utc>>,
    cancellation_effective_at: Option<DateTime<Utc>>,
    refund_status: Option<String>,
    refund_amount: Option<i32>,
    refunded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_domain(self) -> BookingResult<Booking> {
        Ok(Booking {
            id: self.id,
            user_id: self.user_id,
            kind: self.kind.parse::<BookingKind>()?,
            reference_code: self.reference_code,
            travel_date: self.travel_date,
            amount: self.amount,
            currency: self.currency,
            description: self.description,
            status: self.status.parse::<BookingStatus>()?,
            payment_status: self.payment_status.parse::<PaymentState>()?,
            flight_id: self.flight_id,
            passengers: self.passengers,
            hotel_id: self.hotel_id,
            metadata: self.metadata,
            cancel_requested_at: self.cancel_requested_at,
            cancellation_effective_at: self.cancellation_effective_at,
            refund_status: self
                .refund_status
                .map(|s| s.parse::<RefundStatus>())
                .transpose()?,
            refund_amount: self.refund_amount,
            refunded_at: self.refunded_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create(&self, booking: &Booking) -> BookingResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(pg_err)?;

        // Flight bookings reserve their seats inside the same transaction;
        // if the conditional decrement loses the race, nothing is inserted.
        if booking.kind == BookingKind::Flight {
            let flight_id = booking.flight_id.ok_or_else(|| {
                BookingError::Validation("flight booking without flight_id".to_string())
            })?;
            let passengers = booking.passengers.ok_or_else(|| {
                BookingError::Validation("flight booking without passengers".to_string())
            })?;
            SeatInventory::reserve(&mut tx, flight_id, passengers).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, kind, reference_code, travel_date, amount, currency,
                description, status, payment_status, flight_id, passengers, hotel_id, metadata,
                cancel_requested_at, cancellation_effective_at, refund_status, refund_amount,
                refunded_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.kind.as_str())
        .bind(&booking.reference_code)
        .bind(booking.travel_date)
        .bind(booking.amount)
        .bind(&booking.currency)
        .bind(&booking.description)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.flight_id)
        .bind(booking.passengers)
        .bind(booking.hotel_id)
        .bind(&booking.metadata)
        .bind(booking.cancel_requested_at)
        .bind(booking.cancellation_effective_at)
        .bind(booking.refund_status.map(|s| s.as_str()))
        .bind(booking.refund_amount)
        .bind(booking.refunded_at)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(pg_err)?;

        tx.commit().await.map_err(pg_err)?;
        Ok(booking.clone())
    }

    async fn get(&self, id: Uuid) -> BookingResult<Option<Booking>> {
        self.fetch(id).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> BookingResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?;

        rows.into_iter().map(BookingRow::into_domain).collect()
    }

    async fn update_status(&self, id: Uuid, status: BookingStatus) -> BookingResult<Booking> {
        let res = sqlx::query("UPDATE bookings SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        if res.rows_affected() == 0 {
            return Err(BookingError::not_found("booking", id));
        }
        self.fetch(id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", id))
    }

    async fn mark_paid(&self, id: Uuid) -> BookingResult<Booking> {
        let res = sqlx::query(
            "UPDATE bookings SET payment_status = 'PAID', status = 'COMPLETED', updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;
        if res.rows_affected() == 0 {
            return Err(BookingError::not_found("booking", id));
        }
        self.fetch(id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", id))
    }

    async fn stamp_cancellation(&self, id: Uuid, now: DateTime<Utc>) -> BookingResult<Booking> {
        let mut booking = self
            .fetch(id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", id))?;
        booking.schedule_cancellation(now);

        sqlx::query(
            r#"
            UPDATE bookings
            SET cancel_requested_at = $2, cancellation_effective_at = $3,
                refund_status = $4, refund_amount = $5, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(booking.cancel_requested_at)
        .bind(booking.cancellation_effective_at)
        .bind(booking.refund_status.map(|s| s.as_str()))
        .bind(booking.refund_amount)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;

        Ok(booking)
    }

    async fn due_cancellations(&self, now: DateTime<Utc>) -> BookingResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings \
             WHERE cancellation_effective_at IS NOT NULL \
               AND cancellation_effective_at <= $1 \
               AND status <> 'CANCELLED' \
             ORDER BY cancellation_effective_at",
            BOOKING_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?;

        rows.into_iter().map(BookingRow::into_domain).collect()
    }

    async fn finalize_cancellation(&self, id: Uuid, now: DateTime<Utc>) -> BookingResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(pg_err)?;

        // Row lock: the admin path and the sweep must not both finalize.
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1 FOR UPDATE",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(pg_err)?;

        let mut booking = row
            .ok_or_else(|| BookingError::not_found("booking", id))?
            .into_domain()?;

        // Exactly-once: a cancelled booking already had its seats released
        // and refund settled.
        if booking.is_cancelled() {
            tx.commit().await.map_err(pg_err)?;
            return Ok(booking);
        }

        let was_paid = booking.payment_status == PaymentState::Paid;
        booking.finalize_cancellation(now);

        sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'CANCELLED', refund_status = $2, refunded_at = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(booking.refund_status.map(|s| s.as_str()))
        .bind(booking.refunded_at)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(pg_err)?;

        if was_paid {
            sqlx::query(
                "UPDATE payments SET status = 'refunded' WHERE booking_id = $1 AND status = 'paid'",
            )
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(pg_err)?;
        }

        if booking.kind == BookingKind::Flight {
            if let (Some(flight_id), Some(passengers)) = (booking.flight_id, booking.passengers) {
                SeatInventory::release(&mut tx, flight_id, passengers).await?;
            }
        }

        tx.commit().await.map_err(pg_err)?;
        Ok(booking)
    }
}
