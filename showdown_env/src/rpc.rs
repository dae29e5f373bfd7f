//! Line-framed JSON request/response over TCP.
//!
//! Every call opens one connection, writes one JSON request line, and reads
//! one JSON [`Reply`] line back:
//!
//! ```text
//! client                                   server
//!   |-- {"damage":6}\n ------------------->|
//!   |                                      |-- handler.handle(request)
//!   |<-- {"status":"ok","body":{..}}\n ----|
//! ```
//!
//! A connection that closes without sending anything (a liveness probe) is
//! dropped silently.

use crate::error::EnvError;
use crate::transport::{AttackTransport, JournalTransport};
use crate::types::{AttackRequest, AttackResponse, Endpoint, JournalRequest, JournalResponse, Reply};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Largest accepted frame, request or reply.
pub const MAX_FRAME_BYTES: u64 = 64 * 1024;

/// How long the server waits for a client to send its request line.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Server-side handler for one request type.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    type Request: DeserializeOwned + Send + 'static;
    type Response: Serialize + Send + 'static;

    /// Handles one decoded request.
    ///
    /// An error is sent back to the caller as a [`Reply::Error`] frame.
    async fn handle(&self, request: Self::Request) -> Result<Self::Response, EnvError>;
}

/// Serves `handler` on `listener` until `shutdown` is cancelled.
///
/// On cancellation the server stops accepting, waits for every in-flight
/// connection to finish, and only then closes the listener.
pub async fn serve<H: RequestHandler>(
    listener: TcpListener,
    handler: Arc<H>,
    shutdown: CancellationToken,
) -> Result<(), EnvError> {
    let local = listener.local_addr()?;
    let mut in_flight: JoinSet<()> = JoinSet::new();
    let mut served: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = done {
                    error!(%local, error = %e, "Connection task failed");
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    served += 1;
                    let handler = Arc::clone(&handler);
                    in_flight.spawn(async move {
                        if let Err(e) = handle_connection(stream, handler.as_ref()).await {
                            debug!(%peer, error = %e, "Connection ended with error");
                        }
                    });
                }
                Err(e) => warn!(%local, error = %e, "Accept failed"),
            },
        }
    }

    info!(%local, in_flight = in_flight.len(), "Draining in-flight requests");
    while let Some(done) = in_flight.join_next().await {
        if let Err(e) = done {
            error!(%local, error = %e, "Connection task failed during drain");
        }
    }
    drop(listener);
    info!(%local, served, "Server stopped");
    Ok(())
}

async fn handle_connection<H: RequestHandler>(stream: TcpStream, handler: &H) -> Result<(), EnvError> {
    let (read, mut write) = stream.into_split();
    let line = match tokio::time::timeout(REQUEST_READ_TIMEOUT, read_frame(read)).await {
        Ok(frame) => frame?,
        Err(_) => return Err(EnvError::Timeout(REQUEST_READ_TIMEOUT.as_millis() as u64)),
    };
    let Some(line) = line else {
        // Liveness probe: connected and hung up.
        return Ok(());
    };

    let reply = match serde_json::from_str::<H::Request>(&line) {
        Ok(request) => match handler.handle(request).await {
            Ok(body) => Reply::Ok { body },
            Err(e) => Reply::Error { message: e.to_string() },
        },
        Err(e) => Reply::Error {
            message: format!("malformed request: {e}"),
        },
    };

    let mut frame = serde_json::to_vec(&reply)?;
    frame.push(b'\n');
    write.write_all(&frame).await?;
    write.flush().await?;
    Ok(())
}

/// Reads one newline-terminated frame; `None` on immediate EOF.
async fn read_frame<R: AsyncRead + Unpin>(read: R) -> Result<Option<String>, EnvError> {
    let mut reader = BufReader::new(read.take(MAX_FRAME_BYTES));
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    if !line.ends_with('\n') && n as u64 >= MAX_FRAME_BYTES {
        return Err(EnvError::SerializationError(format!(
            "frame exceeds {MAX_FRAME_BYTES} bytes"
        )));
    }
    Ok(Some(line.trim_end().to_string()))
}

/// Issues one request to `addr` and decodes the reply.
pub async fn call<Req, Resp>(addr: &str, request: &Req) -> Result<Resp, EnvError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| EnvError::unreachable(format!("{addr}: {e}")))?;
    let (read, mut write) = stream.into_split();

    let mut frame = serde_json::to_vec(request)?;
    frame.push(b'\n');
    write.write_all(&frame).await?;
    write.flush().await?;

    let line = read_frame(read)
        .await?
        .ok_or_else(|| EnvError::network(format!("{addr} closed the connection without replying")))?;

    match serde_json::from_str::<Reply<Resp>>(&line)? {
        Reply::Ok { body } => Ok(body),
        Reply::Error { message } => Err(EnvError::Remote(message)),
    }
}

/// Attack client dialing the target's endpoint directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpAttackClient;

#[async_trait]
impl AttackTransport for TcpAttackClient {
    async fn attack(&self, target: &Endpoint, request: AttackRequest) -> Result<AttackResponse, EnvError> {
        call(&target.to_string(), &request).await
    }
}

/// Journal client bound to the journal service address.
#[derive(Debug, Clone)]
pub struct TcpJournalClient {
    addr: String,
}

impl TcpJournalClient {
    /// Creates a client for the journal service at `addr` (`host:port`).
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Returns the journal service address.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl JournalTransport for TcpJournalClient {
    async fn append(&self, request: JournalRequest) -> Result<JournalResponse, EnvError> {
        call(&self.addr, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Echo;

    #[async_trait]
    impl RequestHandler for Echo {
        type Request = AttackRequest;
        type Response = AttackResponse;

        async fn handle(&self, request: AttackRequest) -> Result<AttackResponse, EnvError> {
            if request.damage == 0 {
                return Err(EnvError::Remote("zero damage".into()));
            }
            Ok(AttackResponse {
                message: format!("took {}", request.damage),
            })
        }
    }

    struct Counter(AtomicU64);

    #[async_trait]
    impl RequestHandler for Counter {
        type Request = JournalRequest;
        type Response = JournalResponse;

        async fn handle(&self, _request: JournalRequest) -> Result<JournalResponse, EnvError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(JournalResponse {
                offset: self.0.fetch_add(1, Ordering::SeqCst),
            })
        }
    }

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    #[tokio::test]
    async fn test_round_trip_and_error_reply() {
        let (listener, addr) = bind().await;
        let token = CancellationToken::new();
        let server = tokio::spawn(serve(listener, Arc::new(Echo), token.clone()));

        let endpoint: Endpoint = {
            let (host, port) = addr.rsplit_once(':').unwrap();
            Endpoint::new(host, port.parse().unwrap())
        };
        let ok = TcpAttackClient.attack(&endpoint, AttackRequest { damage: 6 }).await.unwrap();
        assert_eq!(ok.message, "took 6");

        let err = TcpAttackClient
            .attack(&endpoint, AttackRequest { damage: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, EnvError::Remote(ref m) if m.contains("zero damage")));

        token.cancel();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_malformed_request_gets_error_reply() {
        let (listener, addr) = bind().await;
        let token = CancellationToken::new();
        let server = tokio::spawn(serve(listener, Arc::new(Echo), token.clone()));

        let err = call::<_, AttackResponse>(&addr, &serde_json::json!({"nope": true}))
            .await
            .unwrap_err();
        assert!(matches!(err, EnvError::Remote(ref m) if m.starts_with("malformed request")));

        token.cancel();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_drains_in_flight_then_closes() {
        let (listener, addr) = bind().await;
        let token = CancellationToken::new();
        let server = tokio::spawn(serve(listener, Arc::new(Counter(AtomicU64::new(0))), token.clone()));

        let client = TcpJournalClient::new(addr.clone());
        let pending = tokio::spawn(async move { client.append(JournalRequest::message("x")).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        // The slow in-flight request still completes.
        assert_eq!(pending.await.unwrap().unwrap().offset, 0);
        server.await.unwrap().unwrap();

        // And the listener is gone afterwards.
        assert!(TcpStream::connect(&addr).await.is_err());
    }

    #[tokio::test]
    async fn test_call_to_closed_port_is_unreachable() {
        let (listener, addr) = bind().await;
        drop(listener);
        let err = TcpJournalClient::new(addr)
            .append(JournalRequest::message("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, EnvError::Unreachable(_)));
    }
}
