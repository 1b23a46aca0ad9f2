use std::time::Duration;

use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ReplyFrame, RequestFrame};
use crate::commands::Service;
use crate::error::AppError;

/// Sends commands to one backend at a fixed address.
///
/// Each call opens its own connection, so a client can be shared freely
/// across concurrent requests. Nothing is retried.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    service: Service,
    address: String,
    timeout: Duration,
}

impl ServiceClient {
    pub fn new(service: Service, address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            service,
            address: address.into(),
            timeout,
        }
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn send(&self, cmd: &str, data: Value) -> Result<Value, AppError> {
        let request = RequestFrame {
            id: Uuid::new_v4(),
            cmd: cmd.to_string(),
            data,
        };

        let reply = tokio::time::timeout(self.timeout, self.round_trip(&request))
            .await
            .map_err(|_| {
                warn!(service = %self.service, cmd, timeout = ?self.timeout, "no reply in time");
                AppError::UpstreamUnavailable(format!(
                    "{} did not reply within {:?}",
                    self.service, self.timeout
                ))
            })??;

        if reply.id != request.id {
            warn!(service = %self.service, cmd, expected = %request.id, got = %reply.id, "uncorrelated reply");
            return Err(AppError::UpstreamError(format!(
                "{} answered a different request",
                self.service
            )));
        }
        debug!(service = %self.service, cmd, "reply received");
        reply.into_result()
    }

    async fn round_trip(&self, request: &RequestFrame) -> Result<ReplyFrame, AppError> {
        let unavailable = |e: std::io::Error| {
            warn!(service = %self.service, address = %self.address, error = %e, "transport failure");
            AppError::UpstreamUnavailable(format!("{} is unreachable", self.service))
        };

        let stream = TcpStream::connect(&self.address).await.map_err(unavailable)?;
        let (read, mut write) = stream.into_split();

        let mut frame = serde_json::to_vec(request).map_err(|e| AppError::Internal(e.into()))?;
        frame.push(b'\n');
        write.write_all(&frame).await.map_err(unavailable)?;

        let mut lines = BufReader::new(read).lines();
        match lines.next_line().await.map_err(unavailable)? {
            Some(line) => serde_json::from_str(&line).map_err(|e| {
                warn!(service = %self.service, error = %e, "malformed reply");
                AppError::UpstreamError(format!("{} sent a malformed reply", self.service))
            }),
            None => Err(AppError::UpstreamUnavailable(format!(
                "{} closed the connection without replying",
                self.service
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CREATE_USER, FIND_USER_BY_ID};
    use crate::transport::server::{serve, CommandHandler};
    use axum::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    struct Users;

    #[async_trait]
    impl CommandHandler for Users {
        fn service(&self) -> Service {
            Service::User
        }

        async fn handle(&self, cmd: &str, data: Value) -> Result<Value, AppError> {
            match cmd {
                CREATE_USER => Ok(data),
                _ => Err(AppError::NotFound("User with ID 42 not found".into())),
            }
        }
    }

    async fn spawn_users() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(serve(listener, Arc::new(Users)));
        addr
    }

    #[tokio::test]
    async fn returns_reply_payload_unmodified() {
        let client = ServiceClient::new(Service::User, spawn_users().await, Duration::from_secs(2));
        let body = json!({"name": "John Doe", "nested": {"a": [1, 2]}});
        assert_eq!(client.send(CREATE_USER, body.clone()).await.unwrap(), body);
    }

    #[tokio::test]
    async fn remote_not_found_stays_not_found() {
        let client = ServiceClient::new(Service::User, spawn_users().await, Duration::from_secs(2));
        let err = client.send(FIND_USER_BY_ID, json!("42")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = ServiceClient::new(Service::User, addr, Duration::from_secs(2));
        let err = client.send(CREATE_USER, json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        // Accept and hold the connection without ever answering.
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = ServiceClient::new(Service::User, addr, Duration::from_millis(100));
        let err = client.send(CREATE_USER, json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(m) if m.contains("did not reply")));
    }

    #[tokio::test]
    async fn garbage_reply_is_upstream_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut line = String::new();
            BufReader::new(&mut socket).read_line(&mut line).await.unwrap();
            socket.write_all(b"not json\n").await.unwrap();
        });

        let client = ServiceClient::new(Service::User, addr, Duration::from_secs(2));
        let err = client.send(CREATE_USER, json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamError(_)));
    }
}
