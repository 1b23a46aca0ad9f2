use tracing::{info, instrument};

use crate::bookings::dto::{
    BookingResponse, BookingStatus, CloseBookingRequest, CreateBookingRequest, UpdateBookingRequest,
};
use crate::bookings::repo::NewBooking;
use crate::error::{parse_id, AppError};
use crate::state::AppState;
use crate::store::{Filter, Update};

const ENTITY: &str = "Booking";

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}

#[instrument(skip(state, req), fields(user_id = %req.user_id, car_id = %req.car_id))]
pub async fn create_booking(
    state: &AppState,
    req: CreateBookingRequest,
) -> Result<BookingResponse, AppError> {
    let booking = state.bookings().insert(&NewBooking::from(req)).await?;
    info!(booking_id = %booking.id, status = ?booking.status, "booking created");
    Ok(booking.into())
}

#[instrument(skip(state))]
pub async fn find_all_bookings(state: &AppState) -> Result<Vec<BookingResponse>, AppError> {
    let bookings = state.bookings().find_all().await?;
    Ok(bookings.into_iter().map(BookingResponse::from).collect())
}

#[instrument(skip(state))]
pub async fn find_booking_by_id(state: &AppState, id: &str) -> Result<BookingResponse, AppError> {
    let booking_id = parse_id(ENTITY, id)?;
    state
        .bookings()
        .find_by_id(booking_id)
        .await?
        .map(BookingResponse::from)
        .ok_or_else(|| AppError::not_found(ENTITY, id))
}

#[instrument(skip(state))]
pub async fn find_bookings_by_user_id(
    state: &AppState,
    user_id: &str,
) -> Result<Vec<BookingResponse>, AppError> {
    let bookings = state
        .bookings()
        .find_many(&Filter::all().eq("userId", user_id.trim()))
        .await?;
    Ok(bookings.into_iter().map(BookingResponse::from).collect())
}

/// Merges the patch; when it carries a status, `active` is recomputed from it.
#[instrument(skip(state, req))]
pub async fn update_booking(
    state: &AppState,
    id: &str,
    req: UpdateBookingRequest,
) -> Result<BookingResponse, AppError> {
    let booking_id = parse_id(ENTITY, id)?;
    let mut update = Update::new().merge(to_json(&req)?)?;
    if let Some(status) = req.status {
        update = update.set("active", !status.is_terminal());
    }
    let booking = state
        .bookings()
        .update_by_id(booking_id, &update.touch())
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, id))?;
    info!(%booking_id, status = ?booking.status, "booking updated");
    Ok(booking.into())
}

async fn close_booking(
    state: &AppState,
    req: &CloseBookingRequest,
    status: BookingStatus,
) -> Result<BookingResponse, AppError> {
    let booking_id = parse_id(ENTITY, &req.id)?;
    let update = Update::new()
        .set("status", to_json(&status)?)
        .set("active", false)
        .touch();
    let booking = state
        .bookings()
        .update_by_id(booking_id, &update)
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, &req.id))?;
    info!(
        %booking_id,
        ?status,
        reason = req.reason.as_deref().unwrap_or("none"),
        "booking closed"
    );
    Ok(booking.into())
}

#[instrument(skip(state, req), fields(id = %req.id))]
pub async fn cancel_booking(
    state: &AppState,
    req: CloseBookingRequest,
) -> Result<BookingResponse, AppError> {
    close_booking(state, &req, BookingStatus::Cancelled).await
}

#[instrument(skip(state, req), fields(id = %req.id))]
pub async fn end_booking(state: &AppState, req: CloseBookingRequest) -> Result<BookingResponse, AppError> {
    close_booking(state, &req, BookingStatus::Ended).await
}

#[instrument(skip(state))]
pub async fn remove_booking(state: &AppState, id: &str) -> Result<(), AppError> {
    let booking_id = parse_id(ENTITY, id)?;
    state
        .bookings()
        .delete_by_id(booking_id)
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, id))?;
    info!(%booking_id, "booking removed");
    Ok(())
}
