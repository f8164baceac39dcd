use super::codec::{RpcResponse, SignedRequest};
use super::connection::{ClearNodeConnection, ConnectionState};
use super::types::{
    AppSession, AppSessionReceipt, Asset, Channel, ChannelStatus, CloseAppSessionRequest,
    CreateAppSessionRequest, LedgerBalance, NodeConfig,
};
use crate::core::errors::ClearNodeError;
use crate::core::traits::{AppSessionCommands, ClearNodeRpc, NodeQueries};
use crate::core::types::ConnectionStatus;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

/// Typed query/command surface over an authenticated connection
pub struct ClearNodeClient {
    connection: ClearNodeConnection,
    request_timeout: Option<Duration>,
    application_address: String,
}

impl ClearNodeClient {
    pub fn new(connection: ClearNodeConnection, application_address: String) -> Self {
        Self {
            connection,
            request_timeout: None,
            application_address,
        }
    }

    /// Override the per-request timeout for every subsequent call
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// `None` restores the configured default
    pub fn set_request_timeout(&mut self, timeout: Option<Duration>) {
        self.request_timeout = timeout;
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
            .unwrap_or_else(|| self.connection.registry().default_timeout())
    }

    pub fn connection(&self) -> &ClearNodeConnection {
        &self.connection
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn last_error(&self) -> Option<String> {
        self.connection.last_error()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn address(&self) -> &str {
        self.connection.address()
    }

    pub fn application_address(&self) -> &str {
        &self.application_address
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RpcResponse> {
        self.connection.subscribe_events()
    }

    pub fn pending_requests(&self) -> usize {
        self.connection.registry().len()
    }

    pub async fn close(&mut self) {
        self.connection.close().await;
    }

    async fn call(&self, request: SignedRequest) -> Result<RpcResponse, ClearNodeError> {
        let status = self.connection.status();
        if !status.is_usable() {
            return Err(ClearNodeError::closed(format!("connection is {}", status)));
        }

        let outcome = self.connection.request(&request, self.request_timeout).await;
        if let Err(e) = &outcome {
            if e.is_request_scoped() {
                debug!(method = %request.request.method, error = %e, "Request failed");
            } else {
                warn!(method = %request.request.method, error = %e, "Request failed on a broken connection");
            }
        }
        outcome
    }

    async fn call_result(&self, request: SignedRequest) -> Result<Value, ClearNodeError> {
        Ok(self.call(request).await?.result)
    }
}

fn decode<T: DeserializeOwned>(result: Value, what: &str) -> Result<T, ClearNodeError> {
    serde_json::from_value(result)
        .map_err(|e| ClearNodeError::UnexpectedPayload(format!("{}: {}", what, e)))
}

/// Lists arrive either bare or wrapped in an object keyed by their name
fn decode_list<T: DeserializeOwned>(result: Value, key: &str) -> Result<Vec<T>, ClearNodeError> {
    match result {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => decode(result, key),
        Value::Object(mut fields) => match fields.remove(key) {
            Some(Value::Null) => Ok(Vec::new()),
            Some(list) => decode(list, key),
            None => Err(ClearNodeError::UnexpectedPayload(format!(
                "{}: result object has no '{}' field",
                key, key
            ))),
        },
        other => Err(ClearNodeError::UnexpectedPayload(format!(
            "{}: expected a list, got {}",
            key, other
        ))),
    }
}

#[async_trait]
impl NodeQueries for ClearNodeClient {
    #[instrument(skip(self), fields(node = %self.connection.node_url()))]
    async fn ping(&self) -> Result<RpcResponse, ClearNodeError> {
        let request = self.connection.messages().ping();
        self.call(request).await
    }

    #[instrument(skip(self), fields(node = %self.connection.node_url()))]
    async fn get_config(&self) -> Result<NodeConfig, ClearNodeError> {
        let request = self.connection.messages().get_config();
        decode(self.call_result(request).await?, "config")
    }

    #[instrument(skip(self), fields(node = %self.connection.node_url()))]
    async fn get_channels(
        &self,
        participant: Option<&str>,
        status: Option<ChannelStatus>,
    ) -> Result<Vec<Channel>, ClearNodeError> {
        let request = self.connection.messages().get_channels(participant, status);
        decode_list(self.call_result(request).await?, "channels")
    }

    #[instrument(skip(self), fields(node = %self.connection.node_url()))]
    async fn get_assets(&self, chain_id: Option<u64>) -> Result<Vec<Asset>, ClearNodeError> {
        let request = self.connection.messages().get_assets(chain_id);
        decode_list(self.call_result(request).await?, "assets")
    }

    #[instrument(skip(self), fields(node = %self.connection.node_url()))]
    async fn get_app_sessions(
        &self,
        participant: &str,
        status: Option<ChannelStatus>,
    ) -> Result<Vec<AppSession>, ClearNodeError> {
        let request = self
            .connection
            .messages()
            .get_app_sessions(participant, status);
        decode_list(self.call_result(request).await?, "app_sessions")
    }

    #[instrument(skip(self), fields(node = %self.connection.node_url()))]
    async fn get_ledger_balances(
        &self,
        account_id: Option<&str>,
    ) -> Result<Vec<LedgerBalance>, ClearNodeError> {
        let request = self
            .connection
            .messages()
            .get_ledger_balances(self.connection.signer(), account_id)?;
        decode_list(self.call_result(request).await?, "ledger_balances")
    }
}

#[async_trait]
impl AppSessionCommands for ClearNodeClient {
    #[instrument(skip(self, request), fields(node = %self.connection.node_url(), participants = request.participants.len()))]
    async fn create_app_session(
        &self,
        request: CreateAppSessionRequest,
    ) -> Result<AppSessionReceipt, ClearNodeError> {
        let message = self.connection.messages().create_app_session(
            self.connection.signer(),
            &request,
            &self.application_address,
        )?;
        decode(self.call_result(message).await?, "app session")
    }

    #[instrument(skip(self, request), fields(node = %self.connection.node_url(), app_session_id = %request.app_session_id))]
    async fn close_app_session(
        &self,
        request: CloseAppSessionRequest,
    ) -> Result<AppSessionReceipt, ClearNodeError> {
        let message = self
            .connection
            .messages()
            .close_app_session(self.connection.signer(), &request)?;
        decode(self.call_result(message).await?, "app session")
    }
}

impl ClearNodeRpc for ClearNodeClient {}
