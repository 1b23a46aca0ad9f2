//! Request/reply command transport between the gateway and the backends.
//!
//! Frames are single-line JSON documents separated by `\n`. Every request
//! carries a correlation id that the reply echoes back.

pub mod client;
pub mod server;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, RemoteError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub id: Uuid,
    pub cmd: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyFrame {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<RemoteError>,
}

impl ReplyFrame {
    pub fn from_result(id: Uuid, outcome: Result<Value, AppError>) -> Self {
        match outcome {
            Ok(response) => Self {
                id,
                response: Some(response),
                err: None,
            },
            Err(e) => Self {
                id,
                response: None,
                err: Some(e.to_remote()),
            },
        }
    }

    pub fn into_result(self) -> Result<Value, AppError> {
        match self.err {
            Some(err) => Err(err.into()),
            None => Ok(self.response.unwrap_or(Value::Null)),
        }
    }
}

/// Payload of the `update_*` commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdUpdate<T> {
    pub id: String,
    pub update: T,
}

/// Payload of the `update_*_rules` commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesUpdate<T> {
    pub id: String,
    pub rules: T,
}

/// Serialize a service result as a reply body.
pub fn reply<T: Serialize>(value: T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}
