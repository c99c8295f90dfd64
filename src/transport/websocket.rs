//! WebSocket implementation of the transport port.
//!
//! Control frames travel as JSON text messages. Anything else arriving on
//! the socket (undecodable text, binary payloads) surfaces as
//! [`TransportEvent::Malformed`] and is ignored upstream. Protocol-level
//! ping/pong frames are handled by tungstenite itself and never reach the
//! liveness layer; the JSON heartbeat works through intermediaries that
//! strip or synthesize protocol-level pings.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::ControlFrame;

use super::port::{Connector, Transport, TransportEvent};

// ============================================================================
// Types
// ============================================================================

/// The underlying stream type produced by `connect_async`.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WsConnector
// ============================================================================

/// Opens WebSocket transports against a fixed endpoint.
///
/// # Example
///
/// ```no_run
/// use linkpulse::{Session, WsConnector};
///
/// # fn example() -> linkpulse::Result<()> {
/// let connector = WsConnector::new("ws://127.0.0.1:9000/live")?;
/// let session = Session::builder(connector).build()?;
/// session.start();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct WsConnector {
    /// Validated endpoint URL.
    url: Url,
}

impl WsConnector {
    /// Creates a connector for the given `ws://` or `wss://` endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::UrlParse`] if the endpoint cannot be parsed
    /// - [`Error::Config`] if the scheme is not `ws` or `wss`
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(endpoint.as_ref())?;

        match url.scheme() {
            "ws" | "wss" => Ok(Self { url }),
            other => Err(Error::config(format!(
                "unsupported websocket scheme: {other}"
            ))),
        }
    }

    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self) -> Result<WsTransport> {
        debug!(url = %self.url, "opening websocket transport");

        let (stream, _response) = connect_async(self.url.as_str()).await?;
        let (write, read) = stream.split();

        Ok(WsTransport { write, read })
    }
}

// ============================================================================
// WsTransport
// ============================================================================

/// A live WebSocket link carrying JSON control frames.
pub struct WsTransport {
    /// Write half of the socket.
    write: SplitSink<WsStream, Message>,
    /// Read half of the socket.
    read: SplitStream<WsStream>,
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: ControlFrame) -> Result<()> {
        let json = serde_json::to_string(&frame)?;
        self.write.send(Message::Text(json.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => {
                    return match serde_json::from_str::<ControlFrame>(&text) {
                        Ok(frame) => TransportEvent::Frame(frame),
                        Err(error) => {
                            trace!(%error, "undecodable text frame");
                            TransportEvent::Malformed
                        }
                    };
                }

                Some(Ok(Message::Binary(data))) => {
                    trace!(len = data.len(), "unexpected binary frame");
                    return TransportEvent::Malformed;
                }

                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "websocket closed by remote");
                    return TransportEvent::Closed;
                }

                // Protocol-level Ping/Pong/Frame, handled by tungstenite.
                Some(Ok(_)) => {}

                Some(Err(error)) => {
                    debug!(%error, "websocket read error");
                    return TransportEvent::Closed;
                }

                None => return TransportEvent::Closed,
            }
        }
    }

    async fn close(&mut self) {
        if let Err(error) = self.write.close().await {
            trace!(%error, "websocket close handshake failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
