use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BookingError;

/// Hours between a cancellation request and the moment it becomes final.
pub const CANCELLATION_DELAY_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingKind {
    Flight,
    Hotel,
}

impl BookingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingKind::Flight => "FLIGHT",
            BookingKind::Hotel => "HOTEL",
        }
    }
}

impl std::str::FromStr for BookingKind {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FLIGHT" => Ok(BookingKind::Flight),
            "HOTEL" => Ok(BookingKind::Hotel),
            other => Err(BookingError::Persistence(format!(
                "unknown booking kind: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(BookingError::Persistence(format!(
                "unknown booking status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    Unpaid,
    Paid,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Unpaid => "UNPAID",
            PaymentState::Paid => "PAID",
        }
    }
}

impl std::str::FromStr for PaymentState {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNPAID" => Ok(PaymentState::Unpaid),
            "PAID" => Ok(PaymentState::Paid),
            other => Err(BookingError::Persistence(format!(
                "unknown payment state: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Pending,
    Refunded,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Pending => "PENDING",
            RefundStatus::Refunded => "REFUNDED",
        }
    }
}

impl std::str::FromStr for RefundStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RefundStatus::Pending),
            "REFUNDED" => Ok(RefundStatus::Refunded),
            other => Err(BookingError::Persistence(format!(
                "unknown refund status: {}",
                other
            ))),
        }
    }
}

/// A single flight or hotel reservation and its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: BookingKind,
    pub reference_code: String,
    pub travel_date: DateTime<Utc>,
    pub amount: i32,
    pub currency: String,
    pub description: Option<String>,
    pub status: BookingStatus,
    pub payment_status: PaymentState,
    pub flight_id: Option<Uuid>,
    pub passengers: Option<i32>,
    pub hotel_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub cancel_requested_at: Option<DateTime<Utc>>,
    pub cancellation_effective_at: Option<DateTime<Utc>>,
    pub refund_status: Option<RefundStatus>,
    pub refund_amount: Option<i32>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating a booking.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub user_id: Uuid,
    pub kind: BookingKind,
    pub reference_code: String,
    pub travel_date: DateTime<Utc>,
    pub amount: i32,
    pub currency: String,
    pub description: Option<String>,
    pub flight_id: Option<Uuid>,
    pub passengers: Option<i32>,
    pub hotel_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

impl Booking {
    pub fn from_request(req: NewBooking, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: req.user_id,
            kind: req.kind,
            reference_code: req.reference_code,
            travel_date: req.travel_date,
            amount: req.amount,
            currency: req.currency,
            description: req.description,
            status: BookingStatus::Pending,
            payment_status: PaymentState::Unpaid,
            flight_id: req.flight_id,
            passengers: req.passengers,
            hotel_id: req.hotel_id,
            metadata: req.metadata.unwrap_or_else(|| serde_json::json!({})),
            cancel_requested_at: None,
            cancellation_effective_at: None,
            refund_status: None,
            refund_amount: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    /// Stamp the cancellation window. Does not change `status`; the
    /// reconciliation sweep performs the actual transition once the window
    /// elapses.
    pub fn schedule_cancellation(&mut self, now: DateTime<Utc>) {
        self.cancel_requested_at = Some(now);
        self.cancellation_effective_at = Some(now + Duration::hours(CANCELLATION_DELAY_HOURS));
        if self.payment_status == PaymentState::Paid {
            self.refund_status = Some(RefundStatus::Pending);
            self.refund_amount = Some(self.amount);
        }
        self.updated_at = now;
    }

    /// Apply the terminal cancellation transition: flip status and settle the
    /// refund marker. Inventory release is the store's responsibility, inside
    /// the same unit of work.
    pub fn finalize_cancellation(&mut self, now: DateTime<Utc>) {
        self.status = BookingStatus::Cancelled;
        if self.payment_status == PaymentState::Paid {
            self.refund_status = Some(RefundStatus::Refunded);
            self.refunded_at = Some(now);
        }
        self.updated_at = now;
    }

    pub fn is_cancellation_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_cancelled()
            && self
                .cancellation_effective_at
                .map(|at| at <= now)
                .unwrap_or(false)
    }
}
