use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::catalog::{Flight, Hotel};
use crate::error::BookingResult;
use crate::payment::Payment;

/// Read access to the flight/hotel catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_flight(&self, id: Uuid) -> BookingResult<Option<Flight>>;

    async fn get_hotel(&self, id: Uuid) -> BookingResult<Option<Hotel>>;
}

/// Booking persistence. Implementations own the unit-of-work boundaries:
/// `create` reserves flight seats and inserts the booking atomically, and
/// `finalize_cancellation` flips status, settles the refund and releases
/// seats atomically. Counters are only ever mutated through atomic
/// check-and-decrement / clipped-increment primitives, never via
/// read-modify-write across round trips.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert the booking; for flight bookings the seat reservation commits
    /// in the same unit of work and the whole call fails with
    /// `InventoryUnavailable` when seats ran out.
    async fn create(&self, booking: &Booking) -> BookingResult<Booking>;

    async fn get(&self, id: Uuid) -> BookingResult<Option<Booking>>;

    async fn list_for_user(&self, user_id: Uuid) -> BookingResult<Vec<Booking>>;

    /// Direct status overwrite (admin path). Never releases inventory; the
    /// terminal transition must go through `finalize_cancellation`.
    async fn update_status(&self, id: Uuid, status: BookingStatus) -> BookingResult<Booking>;

    /// Payment confirmation side: payment_status -> PAID, status -> COMPLETED.
    async fn mark_paid(&self, id: Uuid) -> BookingResult<Booking>;

    /// Stamp cancellation metadata (requested-at, effective-at, refund
    /// marker) without touching `status`.
    async fn stamp_cancellation(&self, id: Uuid, now: DateTime<Utc>) -> BookingResult<Booking>;

    /// Bookings whose cancellation window has elapsed and that are not yet
    /// cancelled, ordered by effective time.
    async fn due_cancellations(&self, now: DateTime<Utc>) -> BookingResult<Vec<Booking>>;

    /// Atomically finalize a cancellation: status -> CANCELLED, refund
    /// settled if the booking was paid (including the linked payment row),
    /// flight seats released. Finalizing an already-cancelled booking is a
    /// no-op returning the stored booking, so release and refund happen
    /// exactly once.
    async fn finalize_cancellation(&self, id: Uuid, now: DateTime<Utc>) -> BookingResult<Booking>;
}

/// Payment records attached to bookings.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: &Payment) -> BookingResult<Payment>;

    async fn get(&self, id: Uuid) -> BookingResult<Option<Payment>>;

    /// Flip to `paid` and stamp `paid_at`.
    async fn confirm(&self, id: Uuid, now: DateTime<Utc>) -> BookingResult<Payment>;

    /// Flip to `refunded`. In the Postgres store the scheduler performs this
    /// flip inside the finalize transaction instead.
    async fn refund(&self, id: Uuid) -> BookingResult<Payment>;
}
