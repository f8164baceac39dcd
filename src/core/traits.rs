use crate::clearnode::codec::RpcResponse;
use crate::clearnode::types::{
    AppSession, AppSessionReceipt, Asset, Channel, ChannelStatus, CloseAppSessionRequest,
    CreateAppSessionRequest, LedgerBalance, NodeConfig,
};
use crate::core::errors::ClearNodeError;
use async_trait::async_trait;

#[async_trait]
pub trait NodeQueries {
    /// Keepalive round trip; returns the raw response envelope
    async fn ping(&self) -> Result<RpcResponse, ClearNodeError>;

    /// Fetch the node's broker and network configuration
    async fn get_config(&self) -> Result<NodeConfig, ClearNodeError>;

    /// List payment channels, optionally filtered by participant and status
    async fn get_channels(
        &self,
        participant: Option<&str>,
        status: Option<ChannelStatus>,
    ) -> Result<Vec<Channel>, ClearNodeError>;

    /// List supported assets, optionally filtered by chain
    async fn get_assets(&self, chain_id: Option<u64>) -> Result<Vec<Asset>, ClearNodeError>;

    /// List application sessions a participant belongs to
    async fn get_app_sessions(
        &self,
        participant: &str,
        status: Option<ChannelStatus>,
    ) -> Result<Vec<AppSession>, ClearNodeError>;

    /// Fetch ledger balances for an account (signed)
    async fn get_ledger_balances(
        &self,
        account_id: Option<&str>,
    ) -> Result<Vec<LedgerBalance>, ClearNodeError>;
}

#[async_trait]
pub trait AppSessionCommands {
    /// Open an application session (signed)
    async fn create_app_session(
        &self,
        request: CreateAppSessionRequest,
    ) -> Result<AppSessionReceipt, ClearNodeError>;

    /// Close an application session with its final allocations (signed)
    async fn close_app_session(
        &self,
        request: CloseAppSessionRequest,
    ) -> Result<AppSessionReceipt, ClearNodeError>;
}

// Composite trait for callers that need the whole surface
#[async_trait]
pub trait ClearNodeRpc: NodeQueries + AppSessionCommands {}
