use crate::core::errors::ClearNodeError;
use tokio_tungstenite::tungstenite::Message;

/// Codec trait for converting between raw WebSocket messages and protocol frames
///
/// Control messages (ping, pong, close) never reach the codec; the transport
/// layer absorbs them.
pub trait WsCodec: Send + Sync + 'static {
    /// Outbound item the codec knows how to frame
    type Request;

    /// The type representing parsed inbound frames
    type Message: Send + Sync;

    /// Encode an outbound request into a WebSocket message
    fn encode_request(&self, request: &Self::Request) -> Result<Message, ClearNodeError>;

    /// Decode a raw WebSocket message into a typed frame
    ///
    /// # Returns
    /// - `Ok(Some(frame))` - Successfully decoded frame
    /// - `Ok(None)` - Message was ignored/filtered by codec
    /// - `Err(error)` - Failed to decode message
    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ClearNodeError>;
}
