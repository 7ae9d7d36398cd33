use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use aerolux_core::booking::{Booking, BookingKind, BookingStatus, PaymentState};
use aerolux_core::catalog::{Flight, Hotel};
use aerolux_core::error::{BookingError, BookingResult};
use aerolux_core::payment::{Payment, PaymentStatus};
use aerolux_core::repository::{BookingRepository, CatalogRepository, PaymentRepository};

/// In-memory implementation of the repository set. One lock covers every
/// table, so each repository call is a single atomic unit of work with the
/// same semantics the Postgres store gets from transactions. Used by the
/// engine and API tests.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    flights: HashMap<Uuid, Flight>,
    hotels: HashMap<Uuid, Hotel>,
    bookings: HashMap<Uuid, Booking>,
    payments: HashMap<Uuid, Payment>,
}

impl Inner {
    fn reserve_seats(&mut self, flight_id: Uuid, count: i32) -> BookingResult<()> {
        let flight = self
            .flights
            .get_mut(&flight_id)
            .ok_or_else(|| BookingError::not_found("flight", flight_id))?;
        if flight.seats_available < count {
            return Err(BookingError::InventoryUnavailable {
                requested: count,
                available: flight.seats_available,
            });
        }
        flight.seats_available -= count;
        Ok(())
    }

    /// Increment clipped at capacity. The clip is a safety net; callers only
    /// release counts they previously reserved.
    fn release_seats(&mut self, flight_id: Uuid, count: i32) -> BookingResult<()> {
        let flight = self
            .flights
            .get_mut(&flight_id)
            .ok_or_else(|| BookingError::not_found("flight", flight_id))?;
        flight.seats_available = (flight.seats_available + count).min(flight.capacity);
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn insert_flight(&self, flight: Flight) {
        self.inner.lock().unwrap().flights.insert(flight.id, flight);
    }

    pub fn insert_hotel(&self, hotel: Hotel) {
        self.inner.lock().unwrap().hotels.insert(hotel.id, hotel);
    }

    pub fn remove_flight(&self, id: Uuid) {
        self.inner.lock().unwrap().flights.remove(&id);
    }

    /// Snapshot of a flight row, for assertions.
    pub fn flight(&self, id: Uuid) -> Option<Flight> {
        self.inner.lock().unwrap().flights.get(&id).cloned()
    }

    pub fn payments_for_booking(&self, booking_id: Uuid) -> Vec<Payment> {
        self.inner
            .lock()
            .unwrap()
            .payments
            .values()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn get_flight(&self, id: Uuid) -> BookingResult<Option<Flight>> {
        Ok(self.inner.lock().unwrap().flights.get(&id).cloned())
    }

    async fn get_hotel(&self, id: Uuid) -> BookingResult<Option<Hotel>> {
        Ok(self.inner.lock().unwrap().hotels.get(&id).cloned())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create(&self, booking: &Booking) -> BookingResult<Booking> {
        let mut inner = self.inner.lock().unwrap();
        if booking.kind == BookingKind::Flight {
            let flight_id = booking
                .flight_id
                .ok_or_else(|| BookingError::Validation("flight booking without flight_id".into()))?;
            let passengers = booking
                .passengers
                .ok_or_else(|| BookingError::Validation("flight booking without passengers".into()))?;
            inner.reserve_seats(flight_id, passengers)?;
        }
        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking.clone())
    }

    async fn get(&self, id: Uuid) -> BookingResult<Option<Booking>> {
        Ok(self.inner.lock().unwrap().bookings.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> BookingResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .inner
            .lock()
            .unwrap()
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn update_status(&self, id: Uuid, status: BookingStatus) -> BookingResult<Booking> {
        let mut inner = self.inner.lock().unwrap();
        let booking = inner
            .bookings
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("booking", id))?;
        booking.status = status;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn mark_paid(&self, id: Uuid) -> BookingResult<Booking> {
        let mut inner = self.inner.lock().unwrap();
        let booking = inner
            .bookings
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("booking", id))?;
        booking.payment_status = PaymentState::Paid;
        booking.status = BookingStatus::Completed;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn stamp_cancellation(&self, id: Uuid, now: DateTime<Utc>) -> BookingResult<Booking> {
        let mut inner = self.inner.lock().unwrap();
        let booking = inner
            .bookings
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("booking", id))?;
        booking.schedule_cancellation(now);
        Ok(booking.clone())
    }

    async fn due_cancellations(&self, now: DateTime<Utc>) -> BookingResult<Vec<Booking>> {
        let mut due: Vec<Booking> = self
            .inner
            .lock()
            .unwrap()
            .bookings
            .values()
            .filter(|b| b.is_cancellation_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|b| b.cancellation_effective_at);
        Ok(due)
    }

    async fn finalize_cancellation(&self, id: Uuid, now: DateTime<Utc>) -> BookingResult<Booking> {
        let mut inner = self.inner.lock().unwrap();
        let booking = inner
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| BookingError::not_found("booking", id))?;

        // Exactly-once: a booking that already reached the terminal state has
        // had its inventory restored and refund settled.
        if booking.is_cancelled() {
            return Ok(booking);
        }

        // Seat release goes first so a missing flight fails the whole step
        // without leaving the booking half-finalized.
        if booking.kind == BookingKind::Flight {
            if let (Some(flight_id), Some(passengers)) = (booking.flight_id, booking.passengers) {
                inner.release_seats(flight_id, passengers)?;
            }
        }

        if booking.payment_status == PaymentState::Paid {
            for payment in inner.payments.values_mut() {
                if payment.booking_id == id && payment.status == PaymentStatus::Paid {
                    payment.status = PaymentStatus::Refunded;
                }
            }
        }

        let stored = inner
            .bookings
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("booking", id))?;
        stored.finalize_cancellation(now);
        Ok(stored.clone())
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn create(&self, payment: &Payment) -> BookingResult<Payment> {
        self.inner
            .lock()
            .unwrap()
            .payments
            .insert(payment.id, payment.clone());
        Ok(payment.clone())
    }

    async fn get(&self, id: Uuid) -> BookingResult<Option<Payment>> {
        Ok(self.inner.lock().unwrap().payments.get(&id).cloned())
    }

    async fn confirm(&self, id: Uuid, now: DateTime<Utc>) -> BookingResult<Payment> {
        let mut inner = self.inner.lock().unwrap();
        let payment = inner
            .payments
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("payment", id))?;
        payment.status = PaymentStatus::Paid;
        payment.paid_at = Some(now);
        Ok(payment.clone())
    }

    async fn refund(&self, id: Uuid) -> BookingResult<Payment> {
        let mut inner = self.inner.lock().unwrap();
        let payment = inner
            .payments
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("payment", id))?;
        payment.status = PaymentStatus::Refunded;
        Ok(payment.clone())
    }
}
