use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use aerolux_core::booking::{
    Booking, BookingKind, BookingStatus, NewBooking, CANCELLATION_DELAY_HOURS,
};
use aerolux_core::clock::Clock;
use aerolux_core::error::{BookingError, BookingResult};
use aerolux_core::repository::{BookingRepository, CatalogRepository};

/// Outcome of a cancellation request: the stamped booking plus an advisory
/// message for the caller.
#[derive(Debug, Clone)]
pub struct CancellationReceipt {
    pub booking: Booking,
    pub message: String,
}

/// Validates booking requests, reserves inventory through the repository's
/// unit of work, and manages the explicit lifecycle transitions.
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    catalog: Arc<dyn CatalogRepository>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        catalog: Arc<dyn CatalogRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            catalog,
            clock,
        }
    }

    pub async fn create_booking(&self, req: NewBooking) -> BookingResult<Booking> {
        let now = self.clock.now();

        // Strictly in the future, for both kinds.
        if req.travel_date <= now {
            return Err(BookingError::InvalidState(
                "travel date must be in the future".to_string(),
            ));
        }

        match req.kind {
            BookingKind::Flight => {
                let flight_id = req.flight_id.ok_or_else(|| {
                    BookingError::Validation("flight_id is required for flight bookings".to_string())
                })?;
                let passengers = req.passengers.ok_or_else(|| {
                    BookingError::Validation(
                        "passengers is required for flight bookings".to_string(),
                    )
                })?;
                if passengers < 1 {
                    return Err(BookingError::Validation(
                        "passengers must be at least 1".to_string(),
                    ));
                }

                let flight = self
                    .catalog
                    .get_flight(flight_id)
                    .await?
                    .ok_or_else(|| BookingError::not_found("flight", flight_id))?;
                if flight.has_departed(now) {
                    return Err(BookingError::InvalidState(format!(
                        "flight {} has already departed",
                        flight.flight_number
                    )));
                }
                // Fast-fail; the repository re-checks atomically at commit.
                if !flight.has_capacity_for(passengers) {
                    return Err(BookingError::InventoryUnavailable {
                        requested: passengers,
                        available: flight.seats_available,
                    });
                }
            }
            BookingKind::Hotel => {
                let hotel_id = req.hotel_id.ok_or_else(|| {
                    BookingError::Validation("hotel_id is required for hotel bookings".to_string())
                })?;
                self.catalog
                    .get_hotel(hotel_id)
                    .await?
                    .ok_or_else(|| BookingError::not_found("hotel", hotel_id))?;
                // No room-level inventory in the reconciliation path.
            }
        }

        let booking = Booking::from_request(req, now);
        let created = self.bookings.create(&booking).await?;
        info!(
            booking_id = %created.id,
            kind = created.kind.as_str(),
            "booking created"
        );
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> BookingResult<Booking> {
        self.bookings
            .get(id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", id))
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> BookingResult<Vec<Booking>> {
        self.bookings.list_for_user(user_id).await
    }

    pub async fn mark_paid(&self, id: Uuid) -> BookingResult<Booking> {
        let booking = self.get(id).await?;
        if booking.is_cancelled() {
            return Err(BookingError::InvalidState(
                "cannot mark a cancelled booking as paid".to_string(),
            ));
        }
        let updated = self.bookings.mark_paid(id).await?;
        info!(booking_id = %id, "booking marked paid");
        Ok(updated)
    }

    /// Admin direct status update. The terminal transition routes through the
    /// same finalize operation the scheduler uses, so inventory release and
    /// refund cannot be skipped.
    pub async fn update_status(&self, id: Uuid, status: BookingStatus) -> BookingResult<Booking> {
        let booking = self.get(id).await?;
        if booking.is_cancelled() && status != BookingStatus::Cancelled {
            return Err(BookingError::InvalidState(
                "cancelled bookings cannot change status".to_string(),
            ));
        }
        if status == BookingStatus::Cancelled {
            return self
                .bookings
                .finalize_cancellation(id, self.clock.now())
                .await;
        }
        self.bookings.update_status(id, status).await
    }

    pub async fn request_cancellation(&self, id: Uuid) -> BookingResult<CancellationReceipt> {
        let booking = self.get(id).await?;

        // Idempotent: cancelling a cancelled booking succeeds without
        // mutating anything.
        if booking.is_cancelled() {
            return Ok(CancellationReceipt {
                message: "booking is already cancelled".to_string(),
                booking,
            });
        }

        let now = self.clock.now();
        if booking.travel_date <= now {
            return Err(BookingError::InvalidState(
                "cannot cancel a booking after its travel date".to_string(),
            ));
        }

        let updated = self.bookings.stamp_cancellation(id, now).await?;
        let effective = updated
            .cancellation_effective_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();
        let mut message = format!(
            "Cancellation requested. It becomes effective in {} hours, at {}.",
            CANCELLATION_DELAY_HOURS, effective
        );
        if let Some(amount) = updated.refund_amount {
            message.push_str(&format!(
                " A refund of {} {} will be issued once the cancellation is finalized.",
                amount, updated.currency
            ));
        }
        info!(booking_id = %id, effective_at = %effective, "cancellation requested");
        Ok(CancellationReceipt {
            booking: updated,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use aerolux_core::booking::PaymentState;
    use aerolux_core::booking::RefundStatus;
    use aerolux_core::catalog::{Flight, Hotel};
    use aerolux_core::clock::ManualClock;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, BookingService) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let service = BookingService::new(store.clone(), store.clone(), clock.clone());
        (store, clock, service)
    }

    fn seed_flight(store: &MemoryStore, capacity: i32, available: i32) -> Uuid {
        let id = Uuid::new_v4();
        store.insert_flight(Flight {
            id,
            flight_number: "AL100".to_string(),
            capacity,
            seats_available: available,
            scheduled_departure: t0() + Duration::days(1),
        });
        id
    }

    fn flight_request(flight_id: Uuid, passengers: i32) -> NewBooking {
        NewBooking {
            user_id: Uuid::new_v4(),
            kind: BookingKind::Flight,
            reference_code: "AL-2001".to_string(),
            travel_date: t0() + Duration::days(1),
            amount: 48000,
            currency: "USD".to_string(),
            description: Some("round trip".to_string()),
            flight_id: Some(flight_id),
            passengers: Some(passengers),
            hotel_id: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn flight_booking_reserves_seats_atomically() {
        let (store, _clock, service) = setup();
        let flight_id = seed_flight(&store, 2, 2);

        let booking = service
            .create_booking(flight_request(flight_id, 2))
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentState::Unpaid);
        assert_eq!(store.flight(flight_id).unwrap().seats_available, 0);

        // Scenario A: next booking fails, seats stay at zero.
        let err = service
            .create_booking(flight_request(flight_id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InventoryUnavailable { .. }));
        assert_eq!(store.flight(flight_id).unwrap().seats_available, 0);
    }

    #[tokio::test]
    async fn racing_bookings_for_the_last_seat_admit_one() {
        let (store, _clock, service) = setup();
        let flight_id = seed_flight(&store, 1, 1);
        let service = Arc::new(service);

        let a = {
            let service = service.clone();
            tokio::spawn(async move { service.create_booking(flight_request(flight_id, 1)).await })
        };
        let b = {
            let service = service.clone();
            tokio::spawn(async move { service.create_booking(flight_request(flight_id, 1)).await })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert_eq!(store.flight(flight_id).unwrap().seats_available, 0);
    }

    #[tokio::test]
    async fn travel_date_boundary_is_strict() {
        let (store, _clock, service) = setup();
        let flight_id = seed_flight(&store, 10, 10);

        let mut past = flight_request(flight_id, 1);
        past.travel_date = t0() - Duration::days(1);
        assert!(matches!(
            service.create_booking(past).await.unwrap_err(),
            BookingError::InvalidState(_)
        ));

        // One second in the future is enough: the boundary is > not >=.
        let mut near = flight_request(flight_id, 1);
        near.travel_date = t0() + Duration::seconds(1);
        assert!(service.create_booking(near).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_flight_is_not_found() {
        let (_store, _clock, service) = setup();
        let err = service
            .create_booking(flight_request(Uuid::new_v4(), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));
    }

    #[tokio::test]
    async fn departed_flight_is_invalid_state() {
        let (store, clock, service) = setup();
        let flight_id = seed_flight(&store, 10, 10);
        clock.advance(Duration::days(2)); // past the departure seeded at t0 + 1d

        let mut req = flight_request(flight_id, 1);
        req.travel_date = clock.now() + Duration::days(1);
        assert!(matches!(
            service.create_booking(req).await.unwrap_err(),
            BookingError::InvalidState(_)
        ));
    }

    #[tokio::test]
    async fn zero_passengers_is_rejected() {
        let (store, _clock, service) = setup();
        let flight_id = seed_flight(&store, 10, 10);
        let err = service
            .create_booking(flight_request(flight_id, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    #[tokio::test]
    async fn hotel_booking_needs_no_inventory() {
        let (store, _clock, service) = setup();
        let hotel_id = Uuid::new_v4();
        store.insert_hotel(Hotel {
            id: hotel_id,
            name: "AeroLux Plaza".to_string(),
            city: Some("Lisbon".to_string()),
        });

        let booking = service
            .create_booking(NewBooking {
                user_id: Uuid::new_v4(),
                kind: BookingKind::Hotel,
                reference_code: "HX-77".to_string(),
                travel_date: t0() + Duration::days(3),
                amount: 30000,
                currency: "EUR".to_string(),
                description: None,
                flight_id: None,
                passengers: None,
                hotel_id: Some(hotel_id),
                metadata: Some(serde_json::json!({"nights": 2})),
            })
            .await
            .unwrap();
        assert_eq!(booking.kind, BookingKind::Hotel);
        assert_eq!(booking.hotel_id, Some(hotel_id));

        let missing = service
            .create_booking(NewBooking {
                user_id: Uuid::new_v4(),
                kind: BookingKind::Hotel,
                reference_code: "HX-78".to_string(),
                travel_date: t0() + Duration::days(3),
                amount: 100,
                currency: "EUR".to_string(),
                description: None,
                flight_id: None,
                passengers: None,
                hotel_id: Some(Uuid::new_v4()),
                metadata: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(missing, BookingError::NotFound(_)));
    }

    #[tokio::test]
    async fn cancellation_request_stamps_window_and_refund() {
        let (store, _clock, service) = setup();
        let flight_id = seed_flight(&store, 4, 4);
        let booking = service
            .create_booking(flight_request(flight_id, 2))
            .await
            .unwrap();
        service.mark_paid(booking.id).await.unwrap();

        let receipt = service.request_cancellation(booking.id).await.unwrap();
        let b = &receipt.booking;
        assert_eq!(b.cancel_requested_at, Some(t0()));
        assert_eq!(b.cancellation_effective_at, Some(t0() + Duration::hours(24)));
        // Status stays what it was; only the scheduler flips it.
        assert_eq!(b.status, BookingStatus::Completed);
        assert_eq!(b.refund_status, Some(RefundStatus::Pending));
        assert_eq!(b.refund_amount, Some(48000));
        assert!(receipt.message.contains("24 hours"));
    }

    #[tokio::test]
    async fn cancelling_a_cancelled_booking_is_idempotent() {
        let (store, clock, service) = setup();
        let flight_id = seed_flight(&store, 4, 4);
        let booking = service
            .create_booking(flight_request(flight_id, 1))
            .await
            .unwrap();
        service.request_cancellation(booking.id).await.unwrap();
        clock.advance(Duration::hours(24));
        service
            .update_status(booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();

        let before = service.get(booking.id).await.unwrap();
        let receipt = service.request_cancellation(booking.id).await.unwrap();
        let after = service.get(booking.id).await.unwrap();

        assert_eq!(receipt.booking.status, BookingStatus::Cancelled);
        assert_eq!(before.cancel_requested_at, after.cancel_requested_at);
        assert_eq!(before.updated_at, after.updated_at);
        assert_eq!(
            store.flight(flight_id).unwrap().seats_available,
            4,
            "no double release"
        );
    }

    #[tokio::test]
    async fn re_requesting_cancellation_restamps_the_window() {
        let (store, clock, service) = setup();
        let flight_id = seed_flight(&store, 4, 4);
        let booking = service
            .create_booking(flight_request(flight_id, 1))
            .await
            .unwrap();

        service.request_cancellation(booking.id).await.unwrap();
        clock.advance(Duration::hours(6));
        let receipt = service.request_cancellation(booking.id).await.unwrap();

        // No undo exists; a second request restarts the 24-hour window.
        let b = &receipt.booking;
        assert_eq!(b.cancel_requested_at, Some(t0() + Duration::hours(6)));
        assert_eq!(
            b.cancellation_effective_at,
            Some(t0() + Duration::hours(30))
        );
    }

    #[tokio::test]
    async fn cancellation_after_travel_date_fails_without_mutation() {
        let (store, clock, service) = setup();
        let flight_id = seed_flight(&store, 4, 4);
        let booking = service
            .create_booking(flight_request(flight_id, 1))
            .await
            .unwrap();

        clock.advance(Duration::days(2)); // trip date has passed
        let err = service.request_cancellation(booking.id).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidState(_)));

        let after = service.get(booking.id).await.unwrap();
        assert!(after.cancel_requested_at.is_none());
        assert!(after.cancellation_effective_at.is_none());
    }

    #[tokio::test]
    async fn mark_paid_completes_the_booking() {
        let (store, _clock, service) = setup();
        let flight_id = seed_flight(&store, 4, 4);
        let booking = service
            .create_booking(flight_request(flight_id, 1))
            .await
            .unwrap();

        let paid = service.mark_paid(booking.id).await.unwrap();
        assert_eq!(paid.payment_status, PaymentState::Paid);
        assert_eq!(paid.status, BookingStatus::Completed);
        // Inventory was reserved at creation; paying does not touch it.
        assert_eq!(store.flight(flight_id).unwrap().seats_available, 3);
    }

    #[tokio::test]
    async fn cancelled_is_terminal() {
        let (store, _clock, service) = setup();
        let flight_id = seed_flight(&store, 4, 4);
        let booking = service
            .create_booking(flight_request(flight_id, 2))
            .await
            .unwrap();
        service
            .update_status(booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();

        assert!(matches!(
            service.mark_paid(booking.id).await.unwrap_err(),
            BookingError::InvalidState(_)
        ));
        assert!(matches!(
            service
                .update_status(booking.id, BookingStatus::Confirmed)
                .await
                .unwrap_err(),
            BookingError::InvalidState(_)
        ));
    }

    #[tokio::test]
    async fn admin_cancel_releases_inventory_and_refunds() {
        let (store, _clock, service) = setup();
        let flight_id = seed_flight(&store, 4, 4);
        let booking = service
            .create_booking(flight_request(flight_id, 2))
            .await
            .unwrap();
        service.mark_paid(booking.id).await.unwrap();
        assert_eq!(store.flight(flight_id).unwrap().seats_available, 2);

        // Admin path goes through the same finalize as the scheduler.
        let cancelled = service
            .update_status(booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.refund_status, Some(RefundStatus::Refunded));
        assert_eq!(store.flight(flight_id).unwrap().seats_available, 4);
    }
}
