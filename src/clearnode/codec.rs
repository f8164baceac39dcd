use crate::core::errors::ClearNodeError;
use crate::core::kernel::codec::WsCodec;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;
use tracing::trace;

/// Code reported for `res` frames whose method is `"error"`; those carry no numeric code
pub const UNSPECIFIED_ERROR_CODE: i64 = 0;

/// Outbound request before framing: `[id, method, params, timestamp]`
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    pub params: Value,
    pub timestamp: u64,
}

impl RpcRequest {
    /// The payload array that gets signed and sent under `req`
    pub fn payload(&self) -> Value {
        json!([self.id, self.method, self.params, self.timestamp])
    }

    /// Canonical bytes a signer signs
    pub fn signing_bytes(&self) -> Result<Vec<u8>, ClearNodeError> {
        Ok(serde_json::to_vec(&self.payload())?)
    }
}

/// A request together with the signatures over its payload
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRequest {
    pub request: RpcRequest,
    pub signatures: Vec<String>,
}

impl SignedRequest {
    pub fn unsigned(request: RpcRequest) -> Self {
        Self {
            request,
            signatures: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.request.id
    }

    pub fn envelope(&self) -> Value {
        json!({
            "req": self.request.payload(),
            "sig": self.signatures,
        })
    }

    /// Serialize to the text frame sent over the wire
    pub fn to_frame(&self) -> String {
        self.envelope().to_string()
    }
}

/// Successful response envelope `{"res": [id, method, result, timestamp]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub request_id: u64,
    pub method: String,
    pub result: Value,
    pub timestamp: Option<u64>,
}

/// Error envelope `{"err": [id, code, message, timestamp]}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcFailure {
    pub request_id: u64,
    pub code: i64,
    pub message: String,
}

impl From<RpcFailure> for ClearNodeError {
    fn from(failure: RpcFailure) -> Self {
        Self::rpc(failure.code, failure.message)
    }
}

/// Parsed inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum RpcFrame {
    Response(RpcResponse),
    Error(RpcFailure),
}

impl RpcFrame {
    pub fn request_id(&self) -> u64 {
        match self {
            Self::Response(response) => response.request_id,
            Self::Error(failure) => failure.request_id,
        }
    }
}

/// Request id carried by an inbound or outbound envelope
pub fn request_id(envelope: &Value) -> Option<u64> {
    ["res", "err", "req"]
        .iter()
        .find_map(|key| envelope.get(*key))
        .and_then(|body| body.get(0))
        .and_then(Value::as_u64)
}

/// Result payload of a `res` envelope, `None` for error envelopes
pub fn result(envelope: &Value) -> Option<&Value> {
    let body = envelope.get("res")?;
    if body.get(1).and_then(Value::as_str) == Some("error") {
        return None;
    }
    body.get(2)
}

/// Error carried by an envelope, if any
pub fn error(envelope: &Value) -> Option<(i64, String)> {
    if let Some(body) = envelope.get("err") {
        let code = body.get(1).and_then(Value::as_i64).unwrap_or(UNSPECIFIED_ERROR_CODE);
        let message = body
            .get(2)
            .map(|m| m.as_str().map_or_else(|| m.to_string(), str::to_string))
            .unwrap_or_default();
        return Some((code, message));
    }

    let body = envelope.get("res")?;
    if body.get(1).and_then(Value::as_str) != Some("error") {
        return None;
    }
    let params = body.get(2);
    let message = params
        .and_then(|p| p.get("error"))
        .or(params)
        .map(|m| m.as_str().map_or_else(|| m.to_string(), str::to_string))
        .unwrap_or_default();
    Some((UNSPECIFIED_ERROR_CODE, message))
}

/// Turn a parsed envelope into a frame; `None` when it carries no request id
pub fn parse_envelope(envelope: &Value) -> Option<RpcFrame> {
    let id = request_id(envelope)?;

    if let Some((code, message)) = error(envelope) {
        return Some(RpcFrame::Error(RpcFailure {
            request_id: id,
            code,
            message,
        }));
    }

    let body = envelope.get("res")?;
    Some(RpcFrame::Response(RpcResponse {
        request_id: id,
        method: body
            .get(1)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        result: result(envelope).cloned().unwrap_or(Value::Null),
        timestamp: body.get(3).and_then(Value::as_u64),
    }))
}

/// Frame codec for the ClearNode RPC protocol
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearNodeCodec;

impl ClearNodeCodec {
    pub const fn new() -> Self {
        Self
    }

    pub fn decode_text(&self, text: &str) -> Result<Option<RpcFrame>, ClearNodeError> {
        let envelope: Value = serde_json::from_str(text)?;
        let frame = parse_envelope(&envelope);
        if frame.is_none() {
            trace!(frame = %text, "Frame carries no correlatable envelope");
        }
        Ok(frame)
    }
}

impl WsCodec for ClearNodeCodec {
    type Request = SignedRequest;
    type Message = RpcFrame;

    fn encode_request(&self, request: &SignedRequest) -> Result<Message, ClearNodeError> {
        Ok(Message::Text(request.to_frame()))
    }

    fn decode_message(&self, message: Message) -> Result<Option<RpcFrame>, ClearNodeError> {
        match message {
            Message::Text(text) => self.decode_text(&text),
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => self.decode_text(text),
                Err(_) => Ok(None),
            },
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> RpcRequest {
        RpcRequest {
            id: 7,
            method: "ping".to_string(),
            params: json!({}),
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_frame_shape() {
        let signed = SignedRequest {
            request: sample_request(),
            signatures: vec!["0xdead".to_string()],
        };
        let frame: Value = serde_json::from_str(&signed.to_frame()).unwrap();
        assert_eq!(frame["req"], json!([7, "ping", {}, 1_700_000_000_000_u64]));
        assert_eq!(frame["sig"], json!(["0xdead"]));
        assert_eq!(request_id(&frame), Some(7));
    }

    #[test]
    fn test_decode_result_envelope() {
        let frame = ClearNodeCodec
            .decode_text(r#"{"res":[3,"pong",{},1700000000000]}"#)
            .unwrap();
        assert_eq!(
            frame,
            Some(RpcFrame::Response(RpcResponse {
                request_id: 3,
                method: "pong".to_string(),
                result: json!({}),
                timestamp: Some(1_700_000_000_000),
            }))
        );
    }

    #[test]
    fn test_decode_error_envelope() {
        let frame = ClearNodeCodec
            .decode_text(r#"{"err":[9,42,"quorum not met",1700000000000]}"#)
            .unwrap();
        assert_eq!(
            frame,
            Some(RpcFrame::Error(RpcFailure {
                request_id: 9,
                code: 42,
                message: "quorum not met".to_string(),
            }))
        );
    }

    #[test]
    fn test_res_error_method_is_treated_as_error() {
        let envelope = json!({"res": [5, "error", {"error": "invalid signature"}, 1]});
        assert!(result(&envelope).is_none());
        assert_eq!(
            error(&envelope),
            Some((UNSPECIFIED_ERROR_CODE, "invalid signature".to_string()))
        );
    }

    #[test]
    fn test_invalid_json_is_an_error_and_idless_frames_are_skipped() {
        assert!(ClearNodeCodec.decode_text("not json").is_err());
        assert_eq!(ClearNodeCodec.decode_text(r#"{"hello":"world"}"#).unwrap(), None);
    }

    #[test]
    fn test_decode_message_ignores_control_frames() {
        let decoded = ClearNodeCodec.decode_message(Message::Ping(vec![1])).unwrap();
        assert!(decoded.is_none());
    }
}
