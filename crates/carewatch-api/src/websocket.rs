//! Receive-only WebSocket transport for the sensor event source.
//!
//! The core never talks to tokio-tungstenite directly: it opens sockets
//! through the [`Transport`] trait and reads [`Inbound`] items from the
//! resulting [`EventSocket`]. Swapping the transport (tests, replay tools)
//! only requires another `Transport` impl.
//!
//! # Example
//!
//! ```rust,ignore
//! use carewatch_api::websocket::{Inbound, Transport, WebSocketTransport};
//! use futures_util::StreamExt;
//! use url::Url;
//!
//! let transport = WebSocketTransport::default();
//! let mut socket = transport.open(&Url::parse("ws://10.0.0.2:86/ws")?).await?;
//!
//! while let Some(item) = socket.next().await {
//!     if let Inbound::Text(text) = item? {
//!         println!("{text}");
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use futures_core::Stream;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::Error;

/// Upper bound on the close handshake; a dead peer must not stall teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// ── Inbound ──────────────────────────────────────────────────────────

/// One item read from the event socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A UTF-8 text frame, handed to the frame codec.
    Text(String),
    /// Ping, pong or binary traffic. Carries no event but proves the pipe is alive.
    Control,
}

// ── Traits ───────────────────────────────────────────────────────────

/// An open, receive-only event socket.
///
/// The stream yields inbound items until the peer closes (`None`) or the
/// connection fails (`Some(Err(_))`).
pub trait EventSocket: Stream<Item = Result<Inbound, Error>> + Send + Unpin {
    /// Close the socket. Must be safe to call on an already-dead connection.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens event sockets. One transport may open any number of sockets over
/// its lifetime, one at a time.
pub trait Transport: Send + Sync + 'static {
    type Socket: EventSocket + 'static;

    fn open(&self, url: &Url) -> impl Future<Output = Result<Self::Socket, Error>> + Send;
}

// ── WebSocketTransport ───────────────────────────────────────────────

/// tokio-tungstenite backed [`Transport`].
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    /// Limit on the TCP connect + WebSocket upgrade handshake. Default: 10s.
    pub connect_timeout: Duration,
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl WebSocketTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Transport for WebSocketTransport {
    type Socket = SensorSocket;

    async fn open(&self, url: &Url) -> Result<SensorSocket, Error> {
        tracing::info!(url = %url, "Connecting to WebSocket");

        let handshake = tokio_tungstenite::connect_async(url.as_str());
        let (ws_stream, _response) = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: u64::try_from(self.connect_timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        tracing::info!("WebSocket connected");
        Ok(SensorSocket { inner: ws_stream })
    }
}

// ── SensorSocket ─────────────────────────────────────────────────────

/// A live WebSocket connection to the event source.
pub struct SensorSocket {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Stream for SensorSocket {
    type Item = Result<Inbound, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let item = match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
            Some(Ok(Message::Text(text))) => Some(Ok(Inbound::Text(text.as_str().to_owned()))),
            Some(Ok(Message::Close(frame))) => {
                if let Some(ref cf) = frame {
                    tracing::info!(
                        code = %cf.code,
                        reason = %cf.reason,
                        "WebSocket close frame received"
                    );
                } else {
                    tracing::info!("WebSocket close frame received (no payload)");
                }
                None
            }
            // tungstenite answers pings on its own
            Some(Ok(_)) => Some(Ok(Inbound::Control)),
            Some(Err(e)) => Some(Err(Error::WebSocket(e.to_string()))),
            None => {
                tracing::info!("WebSocket stream ended");
                None
            }
        };
        Poll::Ready(item)
    }
}

impl EventSocket for SensorSocket {
    async fn close(&mut self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.inner.close(None)).await {
            Ok(Ok(())) => tracing::debug!("WebSocket closed"),
            Ok(Err(e)) => tracing::debug!(error = %e, "WebSocket close on dead connection"),
            Err(_) => tracing::debug!("WebSocket close handshake timed out"),
        }
    }
}
