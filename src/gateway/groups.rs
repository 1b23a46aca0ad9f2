use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::Value;
use tracing::instrument;

use super::{body, GatewayState};
use crate::commands::{
    ADD_USER_TO_GROUP, CREATE_GROUP, CREATE_GROUP_RULES, DEACTIVATE_GROUP, FIND_ALL_GROUPS,
    FIND_GROUP_BY_CREATOR, FIND_GROUP_BY_ID, REMOVE_GROUP, REMOVE_USER_FROM_GROUP, UPDATE_GROUP,
    UPDATE_GROUP_RULES,
};
use crate::error::AppError;
use crate::groups::dto::{
    CreateGroupRequest, CreateGroupRulesRequest, GroupRules, MembershipRequest, UpdateGroupRequest,
};
use crate::transport::{IdUpdate, RulesUpdate};
use crate::validation::validated;

pub fn router() -> Router<GatewayState> {
    Router::new()
        .route("/", post(create).get(find_all))
        .route("/creator/:created_by", get(find_by_creator))
        .route("/rules", post(create_rules))
        .route("/add-user", post(add_user))
        .route("/remove-user", post(remove_user))
        .route("/:id", get(find_by_id).put(update).delete(remove))
        .route("/:id/rules", put(update_rules))
        .route("/:id/deactivate", post(deactivate))
}

#[instrument(skip(state, payload))]
async fn create(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let dto: CreateGroupRequest = validated(body(payload)?)?;
    let group = state.forward(CREATE_GROUP, &dto).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[instrument(skip(state))]
async fn find_all(State(state): State<GatewayState>) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(FIND_ALL_GROUPS, Value::Null).await?))
}

#[instrument(skip(state))]
async fn find_by_id(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(FIND_GROUP_BY_ID, Value::String(id)).await?))
}

#[instrument(skip(state))]
async fn find_by_creator(
    State(state): State<GatewayState>,
    Path(created_by): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(FIND_GROUP_BY_CREATOR, Value::String(created_by)).await?))
}

#[instrument(skip(state, payload))]
async fn update(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let update: UpdateGroupRequest = validated(body(payload)?)?;
    Ok(Json(state.forward(UPDATE_GROUP, &IdUpdate { id, update }).await?))
}

#[instrument(skip(state, payload))]
async fn create_rules(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let dto: CreateGroupRulesRequest = validated(body(payload)?)?;
    let group = state.forward(CREATE_GROUP_RULES, &dto).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[instrument(skip(state, payload))]
async fn update_rules(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let rules: GroupRules = validated(body(payload)?)?;
    Ok(Json(state.forward(UPDATE_GROUP_RULES, &RulesUpdate { id, rules }).await?))
}

#[instrument(skip(state, payload))]
async fn add_user(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let dto: MembershipRequest = validated(body(payload)?)?;
    Ok(Json(state.forward(ADD_USER_TO_GROUP, &dto).await?))
}

#[instrument(skip(state, payload))]
async fn remove_user(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let dto: MembershipRequest = validated(body(payload)?)?;
    Ok(Json(state.forward(REMOVE_USER_FROM_GROUP, &dto).await?))
}

#[instrument(skip(state))]
async fn remove(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.dispatch(REMOVE_GROUP, Value::String(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn deactivate(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(DEACTIVATE_GROUP, Value::String(id)).await?))
}
