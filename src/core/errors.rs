use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClearNodeError {
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Request id {0} is already pending")]
    DuplicateRequestId(u64),

    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    Timeout { request_id: u64, timeout_ms: u64 },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("No challenge received from ClearNode")]
    NoChallengeReceived,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Unexpected payload: {0}")]
    UnexpectedPayload(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

impl ClearNodeError {
    #[cold]
    #[inline(never)]
    pub fn malformed(details: impl Into<String>) -> Self {
        Self::MalformedMessage(details.into())
    }

    #[cold]
    #[inline(never)]
    pub fn timeout(request_id: u64, timeout_ms: u64) -> Self {
        Self::Timeout {
            request_id,
            timeout_ms,
        }
    }

    #[cold]
    #[inline(never)]
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
        }
    }

    #[cold]
    #[inline(never)]
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed(reason.into())
    }

    /// Whether the failure is local to one request rather than the connection.
    pub fn is_request_scoped(&self) -> bool {
        matches!(
            self,
            Self::MalformedMessage(_)
                | Self::DuplicateRequestId(_)
                | Self::Timeout { .. }
                | Self::Rpc { .. }
                | Self::UnexpectedPayload(_)
        )
    }
}
