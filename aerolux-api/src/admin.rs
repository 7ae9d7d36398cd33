use axum::{
    extract::{Path, State},
    routing::patch,
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::Deserialize;
use uuid::Uuid;

use aerolux_core::booking::{Booking, BookingStatus};

use crate::auth;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/admin/bookings/{id}/status", patch(update_status))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
}

/// Direct status overwrite. Setting CANCELLED funnels into the same finalize
/// operation the scheduler uses, so inventory and refunds stay consistent.
async fn update_status(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let claims = auth::authenticate(&state, bearer.token())?;
    if !claims.is_admin() {
        return Err(AppError::AuthorizationError(
            "admin role required".to_string(),
        ));
    }

    let booking = state.bookings.update_status(id, req.status).await?;

    if req.status == BookingStatus::Cancelled {
        if let Some(flight_id) = booking.flight_id {
            state.invalidate_flight_cache(flight_id);
        }
    }
    Ok(Json(booking))
}
