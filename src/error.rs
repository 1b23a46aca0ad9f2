//! Error taxonomy shared by the gateway and the resource services.
//!
//! `AppError` is what every service operation and every gateway route returns.
//! It renders itself as an HTTP response at the public edge and as a
//! [`RemoteError`] on the internal transport, which the gateway turns back into
//! an `AppError` so that 4xx outcomes survive the hop.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    /// Target record absent, or the identifier is not in the store's format.
    #[error("{0}")]
    NotFound(String),

    /// A unique field collides with an existing record.
    #[error("{0}")]
    Conflict(String),

    /// Payload failed its DTO shape or field checks.
    #[error("{0}")]
    Validation(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// No reply from the downstream service (connect failure, timeout, hang-up).
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// The downstream service answered with a failure or a malformed reply.
    #[error("{0}")]
    UpstreamError(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { collection, field } => {
                AppError::Conflict(format!("{collection} with this {field} already exists"))
            }
            other => AppError::Store(other),
        }
    }
}

/// Error kind as carried in a transport reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    UnknownCommand,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{entity} with ID {id} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownCommand(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Validation(_) => "validation",
            AppError::UnknownCommand(_) => "unknown_command",
            AppError::UpstreamUnavailable(_) => "upstream_unavailable",
            AppError::UpstreamError(_) => "upstream_error",
            AppError::Store(_) | AppError::Internal(_) => "internal",
        }
    }

    /// Shape sent back to the gateway by a backend listener.
    pub fn to_remote(&self) -> RemoteError {
        let (kind, message) = match self {
            AppError::NotFound(m) => (ErrorKind::NotFound, m.clone()),
            AppError::Conflict(m) => (ErrorKind::Conflict, m.clone()),
            AppError::Validation(m) => (ErrorKind::Validation, m.clone()),
            AppError::UnknownCommand(c) => (ErrorKind::UnknownCommand, c.clone()),
            other => {
                tracing::error!(error = %other, "command failed");
                (ErrorKind::Internal, "internal error".to_string())
            }
        };
        RemoteError { kind, message }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        match err.kind {
            ErrorKind::NotFound => AppError::NotFound(err.message),
            ErrorKind::Conflict => AppError::Conflict(err.message),
            ErrorKind::Validation => AppError::Validation(err.message),
            ErrorKind::UnknownCommand => AppError::UnknownCommand(err.message),
            ErrorKind::Internal => AppError::UpstreamError(err.message),
        }
    }
}

/// Parse a record identifier. A malformed id cannot match any record, so it
/// is reported the same way as an absent one.
pub fn parse_id(entity: &str, raw: &str) -> Result<Uuid, AppError> {
    raw.trim()
        .parse::<Uuid>()
        .map_err(|_| AppError::not_found(entity, raw))
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Store(e) => {
                tracing::error!(error = %e, "store failure");
                "Internal server error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(ErrorBody {
                error: self.label(),
                message,
            }),
        )
            .into_response()
    }
}
