use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Protocol version announced in application session definitions
pub const PROTOCOL_VERSION: &str = "NitroRPC/0.4";

/// Status filter shared by channel and app-session listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    Open,
    Closed,
    Resizing,
    Challenged,
}

impl ChannelStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Resizing => "resizing",
            Self::Challenged => "challenged",
        }
    }
}

impl FromStr for ChannelStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "resizing" => Ok(Self::Resizing),
            "challenged" => Ok(Self::Challenged),
            other => Err(format!("unknown channel status '{}'", other)),
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-asset, per-participant balance entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub participant: String,
    pub asset: String,
    pub amount: String,
}

impl Allocation {
    pub fn new(
        participant: impl Into<String>,
        asset: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            participant: participant.into(),
            asset: asset.into(),
            amount: amount.into(),
        }
    }
}

/// Application session definition as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDefinition {
    pub application: String,
    pub protocol: String,
    pub participants: Vec<String>,
    pub weights: Vec<u64>,
    pub quorum: u64,
    pub challenge: u64,
    pub nonce: u64,
}

/// Caller-facing parameters for opening an application session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAppSessionRequest {
    pub participants: Vec<String>,
    pub weights: Vec<u64>,
    pub quorum: u64,
    pub challenge: u64,
    /// Empty means "use the configured application address"
    #[serde(default)]
    pub application: String,
    pub allocations: Vec<Allocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseAppSessionRequest {
    pub app_session_id: String,
    pub allocations: Vec<Allocation>,
}

// Inbound shapes never reject well-formed node JSON: identifiers default to
// empty, statuses stay raw, and unknown fields land in `extra`.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, alias = "chainId")]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub decimals: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default, alias = "channelId")]
    pub channel_id: String,
    #[serde(default)]
    pub participant: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, alias = "chainId")]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Channel {
    /// `None` when the node omitted the status or reported one this client does not model
    pub fn channel_status(&self) -> Option<ChannelStatus> {
        parse_status(self.status.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSession {
    #[serde(default, alias = "appSessionId")]
    pub app_session_id: String,
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub weights: Vec<u64>,
    #[serde(default)]
    pub quorum: Option<u64>,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppSession {
    pub fn channel_status(&self) -> Option<ChannelStatus> {
        parse_status(self.status.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBalance {
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub amount: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default, alias = "brokerAddress")]
    pub broker_address: Option<String>,
    #[serde(default)]
    pub networks: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Node acknowledgement for session open/close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSessionReceipt {
    #[serde(default, alias = "appSessionId")]
    pub app_session_id: String,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppSessionReceipt {
    pub fn channel_status(&self) -> Option<ChannelStatus> {
        parse_status(self.status.as_deref())
    }
}

fn parse_status(status: Option<&str>) -> Option<ChannelStatus> {
    status.and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_asset_keeps_unknown_fields() {
        let asset: Asset = serde_json::from_value(json!({
            "symbol": "USDC",
            "chainId": 1,
            "decimals": 6,
            "token": "0xa0b8",
            "logo": "usdc.svg"
        }))
        .unwrap();

        assert_eq!(asset.symbol, "USDC");
        assert_eq!(asset.chain_id, Some(1));
        assert_eq!(asset.extra.get("logo"), Some(&json!("usdc.svg")));
    }

    #[test]
    fn test_channel_status_wire_format() {
        assert_eq!(serde_json::to_value(ChannelStatus::Open).unwrap(), json!("open"));
        let status: ChannelStatus = serde_json::from_value(json!("challenged")).unwrap();
        assert_eq!(status, ChannelStatus::Challenged);
    }

    #[test]
    fn test_receipt_parses_minimal_payload() {
        let receipt: AppSessionReceipt =
            serde_json::from_value(json!({"app_session_id": "0xabc", "status": "closed"}))
                .unwrap();
        assert_eq!(receipt.app_session_id, "0xabc");
        assert_eq!(receipt.channel_status(), Some(ChannelStatus::Closed));
        assert!(receipt.version.is_none());
    }

    #[test]
    fn test_unknown_channel_status_is_kept_raw() {
        let channel: Channel =
            serde_json::from_value(json!({"channel_id": "0x2", "status": "joining"})).unwrap();
        assert_eq!(channel.status.as_deref(), Some("joining"));
        assert_eq!(channel.channel_status(), None);

        let session: AppSession =
            serde_json::from_value(json!({"app_session_id": "0x3", "status": "Open"})).unwrap();
        assert_eq!(session.channel_status(), Some(ChannelStatus::Open));
    }

    #[test]
    fn test_ledger_balance_keeps_unknown_fields() {
        let balance: LedgerBalance =
            serde_json::from_value(json!({"asset": "usdc", "amount": "1", "locked": "0.5"}))
                .unwrap();
        assert_eq!(balance.amount, "1");
        assert_eq!(balance.extra.get("locked"), Some(&json!("0.5")));
        assert_eq!(
            serde_json::to_value(&balance).unwrap(),
            json!({"asset": "usdc", "amount": "1", "locked": "0.5"})
        );
    }

    #[test]
    fn test_missing_identifiers_default_to_empty() {
        let asset: Asset = serde_json::from_value(json!({"token": "0xabc", "chain_id": 1})).unwrap();
        assert!(asset.symbol.is_empty());
        assert_eq!(asset.token.as_deref(), Some("0xabc"));

        let channel: Channel = serde_json::from_value(json!({"amount": "10"})).unwrap();
        assert!(channel.channel_id.is_empty());

        let receipt: AppSessionReceipt = serde_json::from_value(json!({"version": 2})).unwrap();
        assert!(receipt.app_session_id.is_empty());
        assert_eq!(receipt.version, Some(2));
    }
}
