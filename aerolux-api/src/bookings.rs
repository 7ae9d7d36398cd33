use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aerolux_core::booking::{Booking, BookingKind, NewBooking};
use aerolux_shared::events::BookingCreatedEvent;

use crate::auth;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub kind: BookingKind,
    pub reference_code: String,
    pub travel_date: DateTime<Utc>,
    pub amount: i32,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub description: Option<String>,
    pub flight_id: Option<Uuid>,
    pub passengers: Option<i32>,
    pub hotel_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Serialize)]
pub struct CancellationResponse {
    pub message: String,
    pub booking: Booking,
}

async fn create_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let claims = auth::authenticate(&state, bearer.token())?;
    let user_id = auth::subject_user(&claims)?;

    let booking = state
        .bookings
        .create_booking(NewBooking {
            user_id,
            kind: req.kind,
            reference_code: req.reference_code,
            travel_date: req.travel_date,
            amount: req.amount,
            currency: req.currency,
            description: req.description,
            flight_id: req.flight_id,
            passengers: req.passengers,
            hotel_id: req.hotel_id,
            metadata: req.metadata,
        })
        .await?;

    if let Some(flight_id) = booking.flight_id {
        state.invalidate_flight_cache(flight_id);
    }
    state.publish_event(
        "booking.created",
        booking.id.to_string(),
        &BookingCreatedEvent {
            booking_id: booking.id,
            user_id: booking.user_id,
            kind: booking.kind.as_str().to_string(),
            reference_code: booking.reference_code.clone(),
            timestamp: Utc::now().timestamp(),
        },
    );

    Ok((StatusCode::CREATED, Json(booking)))
}

async fn get_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let claims = auth::authenticate(&state, bearer.token())?;
    let booking = state.bookings.get(id).await?;
    auth::require_owner(&claims, booking.user_id)?;
    Ok(Json(booking))
}

async fn list_bookings(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let claims = auth::authenticate(&state, bearer.token())?;
    let user_id = auth::subject_user(&claims)?;
    let bookings = state.bookings.list_for_user(user_id).await?;
    Ok(Json(bookings))
}

async fn cancel_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancellationResponse>, AppError> {
    let claims = auth::authenticate(&state, bearer.token())?;
    let booking = state.bookings.get(id).await?;
    auth::require_owner(&claims, booking.user_id)?;

    let receipt = state.bookings.request_cancellation(id).await?;
    Ok(Json(CancellationResponse {
        message: receipt.message,
        booking: receipt.booking,
    }))
}
