use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aerolux_core::booking::Booking;
use aerolux_core::payment::Payment;
use aerolux_shared::events::PaymentConfirmedEvent;

use crate::auth;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/payments", post(record_payment))
        .route("/v1/payments/{id}/confirm", post(confirm_payment))
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub booking_id: Uuid,
    pub amount: i32,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub method: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    pub payment: Payment,
    pub booking: Booking,
}

async fn record_payment(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let claims = auth::authenticate(&state, bearer.token())?;
    let user_id = auth::subject_user(&claims)?;

    let booking = state.bookings.get(req.booking_id).await?;
    auth::require_owner(&claims, booking.user_id)?;

    let payment = state
        .payments
        .record_payment(req.booking_id, user_id, req.amount, &req.currency, &req.method)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Success callback of the (mocked) payment gateway: confirm the payment and
/// mark the booking paid. The two writes are paired here, not atomic.
async fn confirm_payment(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfirmPaymentResponse>, AppError> {
    let claims = auth::authenticate(&state, bearer.token())?;
    let existing = state.payments.get(id).await?;
    auth::require_owner(&claims, existing.user_id)?;

    let payment = state.payments.confirm_payment(id).await?;
    let booking = state.bookings.mark_paid(payment.booking_id).await?;

    state.publish_event(
        "payment.confirmed",
        payment.id.to_string(),
        &PaymentConfirmedEvent {
            payment_id: payment.id,
            booking_id: payment.booking_id,
            user_id: payment.user_id,
            amount: payment.amount,
            currency: payment.currency.clone(),
            timestamp: Utc::now().timestamp(),
        },
    );

    Ok(Json(ConfirmPaymentResponse { payment, booking }))
}
