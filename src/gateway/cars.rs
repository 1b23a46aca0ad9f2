use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::Value;
use tracing::instrument;

use super::{body, GatewayState};
use crate::cars::dto::{CarRules, CarType, CreateCarRequest, CreateCarRulesRequest, UpdateCarRequest};
use crate::commands::{
    CREATE_CAR, CREATE_CAR_RULES, DEACTIVATE_CAR, FIND_ALL_CARS, FIND_CAR_BY_ID, FIND_CAR_BY_TYPE,
    REMOVE_CAR, UPDATE_CAR, UPDATE_CAR_RULES,
};
use crate::error::AppError;
use crate::transport::{IdUpdate, RulesUpdate};
use crate::validation::validated;

pub fn router() -> Router<GatewayState> {
    Router::new()
        .route("/", post(create).get(find_all))
        .route("/type/:type", get(find_by_type))
        .route("/rules", post(create_rules))
        .route("/:id", get(find_by_id).put(update).delete(remove))
        .route("/:id/rules", put(update_rules))
        .route("/:id/deactivate", post(deactivate))
}

#[instrument(skip(state, payload))]
async fn create(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let dto: CreateCarRequest = validated(body(payload)?)?;
    let car = state.forward(CREATE_CAR, &dto).await?;
    Ok((StatusCode::CREATED, Json(car)))
}

#[instrument(skip(state))]
async fn find_all(State(state): State<GatewayState>) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(FIND_ALL_CARS, Value::Null).await?))
}

#[instrument(skip(state))]
async fn find_by_id(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(FIND_CAR_BY_ID, Value::String(id)).await?))
}

#[instrument(skip(state))]
async fn find_by_type(
    State(state): State<GatewayState>,
    Path(car_type): Path<String>,
) -> Result<Json<Value>, AppError> {
    let car_type: CarType = car_type.parse()?;
    Ok(Json(state.forward(FIND_CAR_BY_TYPE, &car_type).await?))
}

#[instrument(skip(state, payload))]
async fn update(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let update: UpdateCarRequest = validated(body(payload)?)?;
    Ok(Json(state.forward(UPDATE_CAR, &IdUpdate { id, update }).await?))
}

#[instrument(skip(state, payload))]
async fn create_rules(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let dto: CreateCarRulesRequest = validated(body(payload)?)?;
    let car = state.forward(CREATE_CAR_RULES, &dto).await?;
    Ok((StatusCode::CREATED, Json(car)))
}

#[instrument(skip(state, payload))]
async fn update_rules(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let rules: CarRules = validated(body(payload)?)?;
    Ok(Json(state.forward(UPDATE_CAR_RULES, &RulesUpdate { id, rules }).await?))
}

#[instrument(skip(state))]
async fn remove(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.dispatch(REMOVE_CAR, Value::String(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn deactivate(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.dispatch(DEACTIVATE_CAR, Value::String(id)).await?))
}

#[cfg(test)]
mod tests {
    use crate::gateway::testing::{call, dead_app, live_app};
    use axum::http::StatusCode;
    use serde_json::json;

    fn civic() -> serde_json::Value {
        json!({
            "name": "Civic",
            "description": "Compact sedan",
            "type": "SEDAN",
            "brand": "Honda",
            "model": "Civic",
            "color": "Grey"
        })
    }

    #[tokio::test]
    async fn car_routes_round_trip() {
        let app = live_app().await;
        let (status, car) = call(&app, "POST", "/api/cars", Some(civic())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = car["id"].as_str().unwrap().to_string();

        let (status, listed) = call(&app, "GET", "/api/cars/type/sedan", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, ruled) = call(
            &app,
            "POST",
            "/api/cars/rules",
            Some(json!({"carId": id, "licenseVerification": true})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(ruled["carRules"]["licenseVerification"], json!(true));
        assert_eq!(ruled["active"], json!(true));
        assert!(ruled["createdAt"].is_string());
        assert!(ruled["updatedAt"].is_string());

        let (status, ruled) = call(
            &app,
            "PUT",
            &format!("/api/cars/{id}/rules"),
            Some(json!({"emailVerification": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ruled["carRules"]["licenseVerification"], json!(false));
        assert_eq!(ruled["carRules"]["emailVerification"], json!(true));

        let (status, car) = call(&app, "POST", &format!("/api/cars/{id}/deactivate"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(car["active"], json!(false));

        let (status, _) = call(&app, "DELETE", &format!("/api/cars/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "DELETE", &format!("/api/cars/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_type_is_a_bad_request_without_dispatch() {
        let app = dead_app().await;
        let (status, body) = call(&app, "GET", "/api/cars/type/hovercraft", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("validation"));
    }

    #[tokio::test]
    async fn rules_with_unknown_keys_are_rejected_without_dispatch() {
        let app = dead_app().await;
        let (status, body) = call(
            &app,
            "POST",
            "/api/cars/rules",
            Some(json!({"carId": "abc", "phoneVerification": true, "bogus": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("validation"));
    }
}
