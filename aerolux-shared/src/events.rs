use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub reference_code: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentConfirmedEvent {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub amount: i32,
    pub currency: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub refunded: bool,
    pub refund_amount: Option<i32>,
    pub timestamp: i64,
}
