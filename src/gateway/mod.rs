//! Public HTTP edge. Every route is bound to one command; the command table
//! decides which backend receives it.

pub mod bookings;
pub mod cars;
pub mod groups;
pub mod users;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use axum::{extract::rejection::JsonRejection, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{info, instrument};

use crate::commands::{self, Service};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::transport::client::ServiceClient;

#[derive(Clone)]
pub struct GatewayState {
    clients: Arc<HashMap<Service, ServiceClient>>,
}

impl GatewayState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::from_clients(Service::ALL.into_iter().map(|service| {
            let client = ServiceClient::new(
                service,
                config.endpoint(service).address(),
                config.dispatch_timeout,
            );
            info!(%service, address = client.address(), "dispatch target");
            client
        }))
    }

    pub fn from_clients(clients: impl IntoIterator<Item = ServiceClient>) -> Self {
        let clients = clients.into_iter().map(|c| (c.service(), c)).collect();
        Self {
            clients: Arc::new(clients),
        }
    }

    /// Send `cmd` to the service that owns it and wait for its reply.
    #[instrument(skip(self, data))]
    pub async fn dispatch(&self, cmd: &str, data: Value) -> Result<Value, AppError> {
        let service = commands::resolve(cmd)?;
        let client = self
            .clients
            .get(&service)
            .ok_or_else(|| AppError::Internal(anyhow!("no client configured for {service}")))?;
        client.send(cmd, data).await
    }

    /// Dispatch an already validated DTO.
    pub async fn forward<T: Serialize>(&self, cmd: &str, payload: &T) -> Result<Value, AppError> {
        let data = serde_json::to_value(payload).map_err(|e| AppError::Internal(e.into()))?;
        self.dispatch(cmd, data).await
    }
}

/// Unwrap a JSON body, turning axum's rejection into a validation error.
pub(crate) fn body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    let Json(value) = payload?;
    Ok(value)
}

async fn health() -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    Json(json!({ "status": "OK", "timestamp": timestamp }))
}

pub fn router() -> Router<GatewayState> {
    Router::new()
        .nest("/users", users::router())
        .nest("/cars", cars::router())
        .nest("/bookings", bookings::router())
        .nest("/groups", groups::router())
        .route("/health", get(health))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    use super::GatewayState;
    use crate::app::build_app;
    use crate::bookings::handlers::BookingCommands;
    use crate::cars::handlers::CarCommands;
    use crate::commands::Service;
    use crate::groups::handlers::GroupCommands;
    use crate::state::AppState;
    use crate::transport::{client::ServiceClient, server::{serve, CommandHandler}};
    use crate::users::handlers::UserCommands;

    async fn spawn(handler: Arc<dyn CommandHandler>) -> ServiceClient {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let service = handler.service();
        tokio::spawn(serve(listener, handler));
        ServiceClient::new(service, address, Duration::from_secs(5))
    }

    /// Gateway app backed by four live listeners sharing one memory store.
    pub async fn live_app() -> Router {
        let state = AppState::fake().await;
        let clients = vec![
            spawn(Arc::new(UserCommands::new(state.clone()))).await,
            spawn(Arc::new(CarCommands::new(state.clone()))).await,
            spawn(Arc::new(BookingCommands::new(state.clone()))).await,
            spawn(Arc::new(GroupCommands::new(state))).await,
        ];
        build_app(GatewayState::from_clients(clients))
    }

    /// Gateway app whose backends all refuse connections.
    pub async fn dead_app() -> Router {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);
        let clients = Service::ALL
            .into_iter()
            .map(|s| ServiceClient::new(s, address.clone(), Duration::from_secs(1)));
        build_app(GatewayState::from_clients(clients))
    }

    /// Gateway app whose backends accept connections but never reply.
    pub async fn hung_app(timeout: Duration) -> Router {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let clients = Service::ALL
            .into_iter()
            .map(|s| ServiceClient::new(s, address.clone(), timeout));
        build_app(GatewayState::from_clients(clients))
    }

    pub async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(json) => request.body(Body::from(json.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
