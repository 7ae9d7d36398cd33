use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use aerolux_core::booking::{Booking, PaymentState};
use aerolux_core::clock::Clock;
use aerolux_core::notify::NotificationSink;
use aerolux_core::repository::BookingRepository;
use aerolux_shared::events::BookingCancelledEvent;

/// Outcome of one reconciliation sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub finalized: usize,
    pub failed: usize,
}

/// Periodic task that finalizes cancellations once their effective time has
/// passed. The sole authority for the terminal transition (the admin path
/// funnels into the same repository operation).
///
/// Ticks never overlap: a slow sweep delays the next tick. The clock is
/// injected so tests drive the 24-hour window without waiting it out.
pub struct CancellationScheduler {
    bookings: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
    notifier: Option<Arc<dyn NotificationSink>>,
    sweep_interval: Duration,
}

/// Handle to a running scheduler; `stop` signals shutdown and waits for the
/// task to drain.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl CancellationScheduler {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            bookings,
            clock,
            notifier: None,
            sweep_interval,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Spawn the interval loop. The first sweep runs immediately, which also
    /// catches bookings that came due while the process was down.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, mut rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = interval(self.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                interval_secs = self.sweep_interval.as_secs(),
                "cancellation scheduler started"
            );
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.sweep().await;
                        if report.finalized > 0 || report.failed > 0 {
                            info!(
                                finalized = report.finalized,
                                failed = report.failed,
                                "cancellation sweep done"
                            );
                        }
                    }
                    _ = rx.changed() => {
                        info!("cancellation scheduler stopping");
                        break;
                    }
                }
            }
        });
        SchedulerHandle { shutdown, task }
    }

    /// One pass over every due cancellation. Each booking is finalized in its
    /// own unit of work; a failure is logged and the sweep moves on, leaving
    /// the booking eligible for the next tick.
    pub async fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let due = match self.bookings.due_cancellations(now).await {
            Ok(due) => due,
            Err(e) => {
                error!("due-cancellation query failed: {}", e);
                return SweepReport::default();
            }
        };

        let mut report = SweepReport::default();
        for booking in due {
            match self.bookings.finalize_cancellation(booking.id, now).await {
                Ok(finalized) => {
                    report.finalized += 1;
                    info!(booking_id = %finalized.id, "cancellation finalized");
                    self.notify_cancelled(&finalized);
                }
                Err(e) => {
                    report.failed += 1;
                    error!(booking_id = %booking.id, "failed to finalize cancellation: {}", e);
                }
            }
        }
        report
    }

    /// Fire-and-forget: publish failures must never fail or delay the sweep.
    fn notify_cancelled(&self, booking: &Booking) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        let event = BookingCancelledEvent {
            booking_id: booking.id,
            user_id: booking.user_id,
            refunded: booking.payment_status == PaymentState::Paid,
            refund_amount: booking.refund_amount,
            timestamp: self.clock.now().timestamp(),
        };
        let key = booking.id.to_string();
        tokio::spawn(async move {
            let payload = match serde_json::to_string(&event) {
                Ok(p) => p,
                Err(e) => {
                    error!("failed to encode cancellation event: {}", e);
                    return;
                }
            };
            if let Err(e) = notifier.publish("booking.cancelled", &key, &payload).await {
                error!("failed to publish cancellation event: {}", e);
            }
        });
    }
}
