use super::codec::{RpcRequest, SignedRequest};
use super::types::{
    AppDefinition, ChannelStatus, CloseAppSessionRequest, CreateAppSessionRequest,
    PROTOCOL_VERSION,
};
use crate::core::errors::ClearNodeError;
use crate::core::kernel::signer::MessageSigner;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

pub mod method {
    pub const PING: &str = "ping";
    pub const GET_CONFIG: &str = "get_config";
    pub const GET_CHANNELS: &str = "get_channels";
    pub const GET_ASSETS: &str = "get_assets";
    pub const GET_APP_SESSIONS: &str = "get_app_sessions";
    pub const GET_LEDGER_BALANCES: &str = "get_ledger_balances";
    pub const AUTH_REQUEST: &str = "auth_request";
    pub const AUTH_VERIFY: &str = "auth_verify";
    pub const CREATE_APP_SESSION: &str = "create_app_session";
    pub const CLOSE_APP_SESSION: &str = "close_app_session";
}

/// Parameters of the first handshake step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequestParams {
    pub address: String,
    pub session_key: String,
    pub application: String,
    pub expires_at: u64,
    pub scope: String,
}

pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

/// Builds protocol messages and assigns their request ids
///
/// Ids are unique and strictly increasing for the lifetime of the factory,
/// which is one per connection.
#[derive(Debug)]
pub struct RpcMessageFactory {
    next_id: AtomicU64,
}

impl Default for RpcMessageFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcMessageFactory {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    fn request(&self, method: &str, params: Value) -> RpcRequest {
        RpcRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: method.to_string(),
            params,
            timestamp: now_millis(),
        }
    }

    fn unsigned(&self, method: &str, params: Value) -> SignedRequest {
        SignedRequest::unsigned(self.request(method, params))
    }

    fn signed(
        &self,
        signer: &dyn MessageSigner,
        method: &str,
        params: Value,
    ) -> Result<SignedRequest, ClearNodeError> {
        let request = self.request(method, params);
        let signature = signer.sign(&request.signing_bytes()?)?;
        Ok(SignedRequest {
            request,
            signatures: vec![signature],
        })
    }

    pub fn ping(&self) -> SignedRequest {
        self.unsigned(method::PING, json!({}))
    }

    pub fn get_config(&self) -> SignedRequest {
        self.unsigned(method::GET_CONFIG, json!({}))
    }

    pub fn get_channels(
        &self,
        participant: Option<&str>,
        status: Option<ChannelStatus>,
    ) -> SignedRequest {
        let mut params = Map::new();
        if let Some(participant) = participant {
            params.insert("participant".to_string(), json!(participant));
        }
        if let Some(status) = status {
            params.insert("status".to_string(), json!(status));
        }
        self.unsigned(method::GET_CHANNELS, Value::Object(params))
    }

    pub fn get_assets(&self, chain_id: Option<u64>) -> SignedRequest {
        let params = chain_id.map_or_else(|| json!({}), |id| json!({ "chain_id": id }));
        self.unsigned(method::GET_ASSETS, params)
    }

    pub fn get_app_sessions(
        &self,
        participant: &str,
        status: Option<ChannelStatus>,
    ) -> SignedRequest {
        let mut params = Map::new();
        params.insert("participant".to_string(), json!(participant));
        if let Some(status) = status {
            params.insert("status".to_string(), json!(status));
        }
        self.unsigned(method::GET_APP_SESSIONS, Value::Object(params))
    }

    pub fn get_ledger_balances(
        &self,
        signer: &dyn MessageSigner,
        account_id: Option<&str>,
    ) -> Result<SignedRequest, ClearNodeError> {
        let params = account_id.map_or_else(|| json!({}), |id| json!({ "account_id": id }));
        self.signed(signer, method::GET_LEDGER_BALANCES, params)
    }

    pub fn auth_request(&self, params: &AuthRequestParams) -> SignedRequest {
        self.unsigned(
            method::AUTH_REQUEST,
            json!({
                "address": params.address,
                "session_key": params.session_key,
                "application": params.application,
                "allowances": [],
                "expires_at": params.expires_at,
                "scope": params.scope,
            }),
        )
    }

    pub fn auth_verify(
        &self,
        signer: &dyn MessageSigner,
        challenge: &str,
    ) -> Result<SignedRequest, ClearNodeError> {
        self.signed(signer, method::AUTH_VERIFY, json!({ "challenge": challenge }))
    }

    pub fn create_app_session(
        &self,
        signer: &dyn MessageSigner,
        request: &CreateAppSessionRequest,
        default_application: &str,
    ) -> Result<SignedRequest, ClearNodeError> {
        if request.participants.len() != request.weights.len() {
            return Err(ClearNodeError::malformed(format!(
                "{} participants but {} weights",
                request.participants.len(),
                request.weights.len()
            )));
        }

        let application = if request.application.is_empty() {
            default_application
        } else {
            request.application.as_str()
        };

        let definition = AppDefinition {
            application: application.to_string(),
            protocol: PROTOCOL_VERSION.to_string(),
            participants: request.participants.clone(),
            weights: request.weights.clone(),
            quorum: request.quorum,
            challenge: request.challenge,
            nonce: now_millis(),
        };

        self.signed(
            signer,
            method::CREATE_APP_SESSION,
            json!({
                "definition": definition,
                "allocations": request.allocations,
            }),
        )
    }

    pub fn close_app_session(
        &self,
        signer: &dyn MessageSigner,
        request: &CloseAppSessionRequest,
    ) -> Result<SignedRequest, ClearNodeError> {
        self.signed(
            signer,
            method::CLOSE_APP_SESSION,
            json!({
                "app_session_id": request.app_session_id,
                "allocations": request.allocations,
            }),
        )
    }
}
