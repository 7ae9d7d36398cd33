use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use aerolux_core::error::{BookingError, BookingResult};
use aerolux_core::payment::{Payment, PaymentStatus};
use aerolux_core::repository::PaymentRepository;

use crate::pg_err;

const PAYMENT_COLUMNS: &str =
    "id, booking_id, user_id, amount, currency, method, status, created_at, paid_at";

pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: Uuid) -> BookingResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(pg_err)?;

        row.map(PaymentRow::into_domain).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    user_id: Uuid,
    amount: i32,
    currency: String,
    method: String,
    status: String,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl PaymentRow {
    fn into_domain(self) -> BookingResult<Payment> {
        Ok(Payment {
            id: self.id,
            booking_id: self.booking_id,
            user_id: self.user_id,
            amount: self.amount,
            currency: self.currency,
            method: self.method,
            status: self.status.parse::<PaymentStatus>()?,
            created_at: self.created_at,
            paid_at: self.paid_at,
        })
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn create(&self, payment: &Payment) -> BookingResult<Payment> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, booking_id, user_id, amount, currency, method, status,
                created_at, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.user_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.method)
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .bind(payment.paid_at)
        .execute(&self.pool)
        .await
        .map_err(pg_err)?;

        Ok(payment.clone())
    }

    async fn get(&self, id: Uuid) -> BookingResult<Option<Payment>> {
        self.fetch(id).await
    }

    async fn confirm(&self, id: Uuid, now: DateTime<Utc>) -> BookingResult<Payment> {
        let res = sqlx::query("UPDATE payments SET status = 'paid', paid_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        if res.rows_affected() == 0 {
            return Err(BookingError::not_found("payment", id));
        }
        self.fetch(id)
            .await?
            .ok_or_else(|| BookingError::not_found("payment", id))
    }

    async fn refund(&self, id: Uuid) -> BookingResult<Payment> {
        let res = sqlx::query("UPDATE payments SET status = 'refunded' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(pg_err)?;
        if res.rows_affected() == 0 {
            return Err(BookingError::not_found("payment", id));
        }
        self.fetch(id)
            .await?
            .ok_or_else(|| BookingError::not_found("payment", id))
    }
}
