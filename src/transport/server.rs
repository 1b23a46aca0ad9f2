use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use axum::async_trait;
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};
use tracing::{debug, info, warn};

use super::{ReplyFrame, RequestFrame};
use crate::commands::Service;
use crate::error::AppError;

/// Binds command names to service operations for one backend.
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    fn service(&self) -> Service;

    async fn handle(&self, cmd: &str, data: Value) -> Result<Value, AppError>;
}

/// Longest request line accepted; a peer exceeding it is disconnected.
pub const MAX_FRAME_BYTES: usize = 1 << 20;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections forever, answering every request frame with one reply.
pub async fn serve(listener: TcpListener, handler: Arc<dyn CommandHandler>) -> anyhow::Result<()> {
    let service = handler.service();
    info!(%service, addr = %listener.local_addr()?, "command listener ready");
    loop {
        let (socket, peer) = accept_retrying(|| listener.accept()).await;
        let handler = handler.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(socket, handler).await {
                warn!(%service, %peer, error = %e, "connection dropped");
            }
        });
    }
}

/// Keep calling `accept` until it yields a connection. Errors such as
/// descriptor exhaustion are transient, so they only pause the loop.
async fn accept_retrying<T, F, Fut>(mut accept: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(conn) => return conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

async fn serve_connection(socket: TcpStream, handler: Arc<dyn CommandHandler>) -> anyhow::Result<()> {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = (&mut reader)
            .take(MAX_FRAME_BYTES as u64 + 1)
            .read_until(b'\n', &mut line)
            .await?;
        if n == 0 {
            break;
        }
        if n > MAX_FRAME_BYTES && line.last() != Some(&b'\n') {
            bail!("request frame exceeds {MAX_FRAME_BYTES} bytes");
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        // Without a readable id there is nothing to correlate a reply with.
        let request: RequestFrame = serde_json::from_slice(&line)?;
        let outcome = dispatch_local(handler.as_ref(), &request.cmd, request.data).await;
        let reply = ReplyFrame::from_result(request.id, outcome);
        let mut frame = serde_json::to_vec(&reply)?;
        frame.push(b'\n');
        write.write_all(&frame).await?;
    }
    Ok(())
}

async fn dispatch_local(
    handler: &dyn CommandHandler,
    cmd: &str,
    data: Value,
) -> Result<Value, AppError> {
    let service = handler.service();
    if !service.commands().contains(&cmd) {
        warn!(%service, cmd, "command not served here");
        return Err(AppError::UnknownCommand(cmd.to_string()));
    }
    debug!(%service, cmd, "command received");
    handler.handle(cmd, data).await
}
