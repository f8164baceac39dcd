use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lifecycle state of a ClearNode connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Authenticating,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }

    /// Only a fully authenticated connection may carry typed traffic
    pub const fn is_usable(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invoked synchronously on every status transition, with the error message
/// when the new status is [`ConnectionStatus::Error`].
pub type StatusCallback = Arc<dyn Fn(ConnectionStatus, Option<&str>) + Send + Sync>;

/// A callback that ignores every transition
pub fn noop_status_callback() -> StatusCallback {
    Arc::new(|_: ConnectionStatus, _: Option<&str>| {})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionStatus::Authenticating).unwrap();
        assert_eq!(json, "\"authenticating\"");
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_only_connected_is_usable() {
        assert!(ConnectionStatus::Connected.is_usable());
        assert!(!ConnectionStatus::Authenticating.is_usable());
        assert!(!ConnectionStatus::Error.is_usable());
    }
}
