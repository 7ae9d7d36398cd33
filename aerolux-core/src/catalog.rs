use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flight inventory unit. `seats_available` is guarded by the inventory
/// ledger: 0 <= seats_available <= capacity at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub capacity: i32,
    pub seats_available: i32,
    pub scheduled_departure: DateTime<Utc>,
}

impl Flight {
    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_departure <= now
    }

    pub fn has_capacity_for(&self, seats: i32) -> bool {
        self.seats_available >= seats
    }
}

/// Hotel bookings carry no room-level inventory in the reconciliation path;
/// the record exists so bookings can reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotel {
    pub id: Uuid,
    pub name: String,
    pub city: Option<String>,
}
