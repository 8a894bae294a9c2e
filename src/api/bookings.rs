use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

use crate::db::{Booking, BookingDetails, BookingWithListing, CreateBookingRequest, Listing};
use crate::AppState;

use super::auth::CurrentUser;
use super::error::ApiError;
use super::validation::validate_booking;

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<BookingWithListing>>, ApiError> {
    Ok(Json(Booking::list_for_user(&state.db, &user.id).await?))
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingDetails>), ApiError> {
    validate_booking(&req)?;

    if Listing::find_by_id(&state.db, &req.listing_id).await?.is_none() {
        return Err(ApiError::not_found("Listing not found"));
    }

    let booking = Booking::create(&state.db, &user.id, &req).await?;
    info!(
        booking_id = %booking.booking.id,
        listing_id = %req.listing_id,
        nights = booking.booking.nights(),
        "Created booking"
    );
    Ok((StatusCode::CREATED, Json(booking)))
}
