pub mod memory;
pub mod payments;
pub mod scheduler;
pub mod service;

pub use memory::MemoryStore;
pub use payments::PaymentGate;
pub use scheduler::{CancellationScheduler, SchedulerHandle, SweepReport};
pub use service::{BookingService, CancellationReceipt};
