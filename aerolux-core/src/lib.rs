pub mod booking;
pub mod catalog;
pub mod clock;
pub mod error;
pub mod notify;
pub mod payment;
pub mod repository;

pub use booking::{Booking, BookingKind, BookingStatus, PaymentState, RefundStatus};
pub use catalog::{Flight, Hotel};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BookingError, BookingResult};
pub use notify::NotificationSink;
pub use payment::{Payment, PaymentStatus};
