use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tracing::instrument;

use super::{body, GatewayState};
use crate::bookings::dto::{CloseBookingRequest, CreateBookingRequest, UpdateBookingRequest};
use crate::commands::{
    CANCEL_BOOKING, CREATE_BOOKING, END_BOOKING, FIND_ALL_BOOKINGS, FIND_BOOKING_BY_ID,
    FIND_BOOKING_BY_USER_ID, REMOVE_BOOKING, UPDATE_BOOKING,
};
use crate::error::AppError;
use crate::transport::IdUpdate;
use crate::validation::validated;

pub fn router() -> Router<GatewayState> {
    Router::new()
        .route("/", post(create).get(find_all))
        .route("/user/:user_id", get(find_by_user_id))
        .route("/cancel", post(cancel))
        .route("/end", post(end))
        .route("/:id", get(find_by_id).put(update).delete(remove))
}

#[instrument(skip(state, payload))]
async fn create(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let dto: CreateBookingRequest = validated(body(payload)?)?;
    let booking = state.forward(CREATE_BOOKING, &dto).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[instrument(skip(state))]
async fn find_all(State(state): State<GatewayState>) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(FIND_ALL_BOOKINGS, Value::Null).await?))
}

#[instrument(skip(state))]
async fn find_by_id(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(FIND_BOOKING_BY_ID, Value::String(id)).await?))
}

#[instrument(skip(state))]
async fn find_by_user_id(
    State(state): State<GatewayState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(FIND_BOOKING_BY_USER_ID, Value::String(user_id)).await?))
}

#[instrument(skip(state, payload))]
async fn update(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let update: UpdateBookingRequest = validated(body(payload)?)?;
    Ok(Json(state.forward(UPDATE_BOOKING, &IdUpdate { id, update }).await?))
}

#[instrument(skip(state, payload))]
async fn cancel(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let dto: CloseBookingRequest = validated(body(payload)?)?;
    Ok(Json(state.forward(CANCEL_BOOKING, &dto).await?))
}

#[instrument(skip(state, payload))]
async fn end(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let dto: CloseBookingRequest = validated(body(payload)?)?;
    Ok(Json(state.forward(END_BOOKING, &dto).await?))
}

#[instrument(skip(state))]
async fn remove(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.dispatch(REMOVE_BOOKING, Value::String(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
