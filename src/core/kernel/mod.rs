/// Transport kernel - protocol-agnostic plumbing for the ClearNode client
///
/// The kernel contains only transport logic and the seams the protocol layer
/// plugs into. Nothing here knows about request ids, methods or the auth
/// handshake.
///
/// ## Transport
/// - `WsConnector`: opens a connection and splits it into halves
/// - `WsSink` / `WsStream`: outbound and inbound halves
/// - `TungsteniteWs`: the tokio-tungstenite implementation
///
/// ## Authentication
/// - `MessageSigner`: signs serialized protocol payloads
///
/// ## Message Handling
/// - `WsCodec`: protocol-specific message encoding/decoding
///
/// # Swapping the transport
///
/// Anything implementing `WsConnector` can carry a session, which is how the
/// integration tests drive the client against an in-memory peer:
///
/// ```rust,no_run
/// use clearnode::core::kernel::*;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let ws = TungsteniteWs::new(WsConfig::default());
/// let (mut sink, mut stream) = ws.connect("wss://clearnet.yellow.com/ws").await?;
/// sink.send_raw(tokio_tungstenite::tungstenite::Message::Text("{}".to_string()))
///     .await?;
/// let _reply = stream.next_raw().await;
/// sink.close().await?;
/// # Ok(())
/// # }
/// ```
pub mod codec;
pub mod signer;
pub mod ws;

// Re-export key types for convenience
pub use codec::WsCodec;
pub use signer::{MessageSigner, SignatureResult};
pub use ws::{TungsteniteReader, TungsteniteSink, TungsteniteWs, WsConfig, WsConnector, WsSink, WsStream};
