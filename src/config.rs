use std::time::Duration;

use anyhow::Context;

use crate::commands::Service;

/// Host and port of one backend command listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub http: Endpoint,
    pub users: Endpoint,
    pub cars: Endpoint,
    pub bookings: Endpoint,
    pub groups: Endpoint,
    pub dispatch_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = |prefix: &str, host: &str, port: u16| -> anyhow::Result<Endpoint> {
            let host_key = format!("{prefix}_HOST");
            let port_key = format!("{prefix}_PORT");
            let port = match lookup(&port_key) {
                Some(v) => v
                    .parse::<u16>()
                    .with_context(|| format!("{port_key} must be a port number, got {v:?}"))?,
                None => port,
            };
            Ok(Endpoint {
                host: lookup(&host_key).unwrap_or_else(|| host.into()),
                port,
            })
        };

        let dispatch_timeout = match lookup("DISPATCH_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(
                v.parse::<u64>()
                    .with_context(|| format!("DISPATCH_TIMEOUT_MS must be milliseconds, got {v:?}"))?,
            ),
            None => Duration::from_secs(10),
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            http: endpoint("APP", "0.0.0.0", 3000)?,
            users: endpoint("USER_SERVICE", "127.0.0.1", 8879)?,
            cars: endpoint("CAR_SERVICE", "127.0.0.1", 8878)?,
            bookings: endpoint("BOOKING_SERVICE", "127.0.0.1", 8877)?,
            groups: endpoint("GROUP_SERVICE", "127.0.0.1", 8880)?,
            dispatch_timeout,
        })
    }

    /// Fixed listen address of a backend service.
    pub fn endpoint(&self, service: Service) -> &Endpoint {
        match service {
            Service::User => &self.users,
            Service::Car => &self.cars,
            Service::Booking => &self.bookings,
            Service::Group => &self.groups,
        }
    }
}
