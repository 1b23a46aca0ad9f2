use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tracing::instrument;

use super::{body, GatewayState};
use crate::commands::{
    CREATE_USER, DEACTIVATE_USER, FIND_ALL_USERS, FIND_USER_BY_EMAIL, FIND_USER_BY_ID, REMOVE_USER,
    UPDATE_USER,
};
use crate::error::AppError;
use crate::transport::IdUpdate;
use crate::users::dto::{CreateUserRequest, UpdateUserRequest};
use crate::validation::validated;

pub fn router() -> Router<GatewayState> {
    Router::new()
        .route("/", post(create).get(find_all))
        .route("/email/:email", get(find_by_email))
        .route("/:id", get(find_by_id).put(update).delete(remove))
        .route("/:id/deactivate", post(deactivate))
}

#[instrument(skip(state, payload))]
async fn create(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let dto: CreateUserRequest = validated(body(payload)?)?;
    let user = state.forward(CREATE_USER, &dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state))]
async fn find_all(State(state): State<GatewayState>) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(FIND_ALL_USERS, Value::Null).await?))
}

#[instrument(skip(state))]
async fn find_by_id(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(FIND_USER_BY_ID, Value::String(id)).await?))
}

#[instrument(skip(state))]
async fn find_by_email(
    State(state): State<GatewayState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(FIND_USER_BY_EMAIL, Value::String(email)).await?))
}

#[instrument(skip(state, payload))]
async fn update(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let update: UpdateUserRequest = validated(body(payload)?)?;
    Ok(Json(state.forward(UPDATE_USER, &IdUpdate { id, update }).await?))
}

#[instrument(skip(state))]
async fn remove(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.dispatch(REMOVE_USER, Value::String(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn deactivate(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(DEACTIVATE_USER, Value::String(id)).await?))
}
