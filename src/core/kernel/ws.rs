use crate::core::errors::ClearNodeError;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, instrument, warn};

type TungsteniteStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Capacity of the outbound frame queue
    pub outbound_buffer_size: usize,
    /// Capacity of the push-event broadcast channel
    pub event_buffer_size: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000, // 10 seconds
            outbound_buffer_size: 256,
            event_buffer_size: 1024,
        }
    }
}

impl WsConfig {
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Opens a bidirectional connection and hands back its two halves
#[async_trait]
pub trait WsConnector: Send + Sync {
    type Sink: WsSink + 'static;
    type Stream: WsStream + 'static;

    async fn connect(&self, url: &str) -> Result<(Self::Sink, Self::Stream), ClearNodeError>;
}

/// Outbound half of a connection
#[async_trait]
pub trait WsSink: Send {
    /// Send a raw message
    async fn send_raw(&mut self, msg: Message) -> Result<(), ClearNodeError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ClearNodeError>;
}

/// Inbound half of a connection
#[async_trait]
pub trait WsStream: Send {
    /// Receive the next data message; `None` once the peer closed
    async fn next_raw(&mut self) -> Option<Result<Message, ClearNodeError>>;
}

/// Tungstenite-based connector
#[derive(Debug, Clone, Default)]
pub struct TungsteniteWs {
    config: WsConfig,
}

impl TungsteniteWs {
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }
}

pub struct TungsteniteSink {
    write: SplitSink<TungsteniteStream, Message>,
    closed: bool,
}

pub struct TungsteniteReader {
    read: SplitStream<TungsteniteStream>,
}

#[async_trait]
impl WsConnector for TungsteniteWs {
    type Sink = TungsteniteSink;
    type Stream = TungsteniteReader;

    #[instrument(skip(self))]
    async fn connect(&self, url: &str) -> Result<(Self::Sink, Self::Stream), ClearNodeError> {
        let connection_future = tokio::time::timeout(self.config.connect_timeout(), connect_async(url));

        let (ws_stream, _) = connection_future
            .await
            .map_err(|_| {
                ClearNodeError::ConnectionTimeout("WebSocket connection timeout".to_string())
            })?
            .map_err(|e| {
                ClearNodeError::NetworkError(format!("WebSocket connection failed: {}", e))
            })?;

        debug!("WebSocket connection established");
        let (write, read) = ws_stream.split();
        Ok((
            TungsteniteSink {
                write,
                closed: false,
            },
            TungsteniteReader { read },
        ))
    }
}

#[async_trait]
impl WsSink for TungsteniteSink {
    async fn send_raw(&mut self, msg: Message) -> Result<(), ClearNodeError> {
        if self.closed {
            return Err(ClearNodeError::closed("WebSocket already closed"));
        }

        self.write.send(msg).await.map_err(|e| {
            self.closed = true;
            ClearNodeError::NetworkError(format!("Failed to send WebSocket message: {}", e))
        })
    }

    async fn close(&mut self) -> Result<(), ClearNodeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Err(e) = self.write.send(Message::Close(None)).await {
            warn!("Failed to send close frame: {}", e);
        }
        Ok(())
    }
}

#[async_trait]
impl WsStream for TungsteniteReader {
    async fn next_raw(&mut self) -> Option<Result<Message, ClearNodeError>> {
        loop {
            match self.read.next().await? {
                // tungstenite queues the pong reply itself
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "WebSocket closed by peer");
                    return None;
                }
                Ok(message) => return Some(Ok(message)),
                Err(e) => {
                    return Some(Err(ClearNodeError::NetworkError(format!(
                        "WebSocket error: {}",
                        e
                    ))))
                }
            }
        }
    }
}
