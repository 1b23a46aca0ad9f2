use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::net::TcpListener;

mod app;
mod bookings;
mod cars;
mod commands;
mod config;
mod error;
mod gateway;
mod groups;
mod state;
mod store;
mod transport;
mod users;
mod validation;

use crate::commands::Service;
use crate::config::AppConfig;
use crate::gateway::GatewayState;
use crate::state::AppState;
use crate::transport::server::CommandHandler;

/// Which part of the system this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Gateway,
    Backend(Service),
    All,
}

impl Role {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "gateway" => Role::Gateway,
            "users" => Role::Backend(Service::User),
            "cars" => Role::Backend(Service::Car),
            "bookings" => Role::Backend(Service::Booking),
            "groups" => Role::Backend(Service::Group),
            "all" => Role::All,
            other => bail!("unknown role {other:?}; expected gateway, users, cars, bookings, groups or all"),
        })
    }
}

fn handler(service: Service, state: AppState) -> Arc<dyn CommandHandler> {
    match service {
        Service::User => Arc::new(users::handlers::UserCommands::new(state)),
        Service::Car => Arc::new(cars::handlers::CarCommands::new(state)),
        Service::Booking => Arc::new(bookings::handlers::BookingCommands::new(state)),
        Service::Group => Arc::new(groups::handlers::GroupCommands::new(state)),
    }
}

async fn run_backend(config: &AppConfig, service: Service, state: AppState) -> anyhow::Result<()> {
    let addr = config.endpoint(service).address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {service} on {addr}"))?;
    transport::server::serve(listener, handler(service, state)).await
}

async fn run_gateway(config: &AppConfig) -> anyhow::Result<()> {
    let app = app::build_app(GatewayState::from_config(config));
    app::serve(app, &config.http).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "car_booking=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let role = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SERVICE_ROLE").ok())
        .unwrap_or_else(|| "all".to_string());
    let role = Role::parse(&role)?;
    let config = AppConfig::from_env()?;
    tracing::info!(?role, "starting");

    match role {
        Role::Gateway => run_gateway(&config).await,
        Role::Backend(service) => {
            let state = AppState::init(&config).await?;
            run_backend(&config, service, state).await
        }
        Role::All => {
            let state = AppState::init(&config).await?;
            tokio::try_join!(
                run_backend(&config, Service::User, state.clone()),
                run_backend(&config, Service::Car, state.clone()),
                run_backend(&config, Service::Booking, state.clone()),
                run_backend(&config, Service::Group, state),
                run_gateway(&config),
            )?;
            Ok(())
        }
    }
}
