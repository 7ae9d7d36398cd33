use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use aerolux_core::clock::Clock;
use aerolux_core::error::{BookingError, BookingResult};
use aerolux_core::payment::Payment;
use aerolux_core::repository::{BookingRepository, PaymentRepository};

/// Records payment attempts and outcomes against bookings. Confirmation is
/// paired with `BookingService::mark_paid` by the caller; the refund flip is
/// performed by the cancellation finalize step.
pub struct PaymentGate {
    payments: Arc<dyn PaymentRepository>,
    bookings: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
}

impl PaymentGate {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        bookings: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            payments,
            bookings,
            clock,
        }
    }

    /// Create a `pending` payment row. No side effect on the booking.
    pub async fn record_payment(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
        amount: i32,
        currency: &str,
        method: &str,
    ) -> BookingResult<Payment> {
        if self.bookings.get(booking_id).await?.is_none() {
            return Err(BookingError::not_found("booking", booking_id));
        }
        let payment = Payment::new(
            booking_id,
            user_id,
            amount,
            currency.to_string(),
            method.to_string(),
            self.clock.now(),
        );
        let created = self.payments.create(&payment).await?;
        info!(payment_id = %created.id, booking_id = %booking_id, "payment recorded");
        Ok(created)
    }

    pub async fn confirm_payment(&self, payment_id: Uuid) -> BookingResult<Payment> {
        let confirmed = self.payments.confirm(payment_id, self.clock.now()).await?;
        info!(payment_id = %payment_id, "payment confirmed");
        Ok(confirmed)
    }

    pub async fn refund(&self, payment_id: Uuid) -> BookingResult<Payment> {
        self.payments.refund(payment_id).await
    }

    pub async fn get(&self, payment_id: Uuid) -> BookingResult<Payment> {
        self.payments
            .get(payment_id)
            .await?
            .ok_or_else(|| BookingError::not_found("payment", payment_id))
    }
}
