//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use stakemate_protocol::ConnectionId;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let ws = tokio_tungstenite::accept_async(stream).await.map_err(|e| {
            TransportError::AcceptFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                e,
            ))
        })?;

        let id = ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(conn = %id, %addr, "accepted WebSocket connection");

        Ok(WebSocketConnection { id, ws })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// A single upgraded WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    ws: WsStream,
}

impl Connection for WebSocketConnection {
    type Writer = WebSocketWriter;
    type Reader = WebSocketReader;

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn split(self) -> (WebSocketWriter, WebSocketReader) {
        let (sink, stream) = self.ws.split();
        (
            WebSocketWriter { id: self.id, sink },
            WebSocketReader { id: self.id, stream },
        )
    }
}

/// Write half of a [`WebSocketConnection`].
pub struct WebSocketWriter {
    id: ConnectionId,
    sink: SplitSink<WsStream, Message>,
}

impl WebSocketWriter {
    /// Sends one text frame.
    pub async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.sink.send(Message::text(text)).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    /// Sends a close frame and flushes the sink.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        tracing::debug!(conn = %self.id, "closing WebSocket");
        self.sink.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }
}

/// Read half of a [`WebSocketConnection`].
pub struct WebSocketReader {
    id: ConnectionId,
    stream: SplitStream<WsStream>,
}

impl WebSocketReader {
    /// Receives the next text frame.
    ///
    /// Binary frames are accepted if they hold UTF-8. Ping/pong frames are
    /// answered by tungstenite and skipped here. Returns `Ok(None)` when the
    /// peer closes cleanly.
    pub async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return String::from_utf8(data.to_vec()).map(Some).map_err(
                        |e| {
                            TransportError::ReceiveFailed(std::io::Error::new(
                                std::io::ErrorKind::InvalidData,
                                e,
                            ))
                        },
                    );
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(conn = %self.id, "peer closed WebSocket");
                    return Ok(None);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }
}
