use super::registry::PendingRegistry;
use super::rpc::{AuthRequestParams, RpcMessageFactory};
use crate::core::errors::ClearNodeError;
use crate::core::kernel::signer::MessageSigner;
use serde_json::Value;
use tracing::{debug, instrument};

/// Handshake settings taken from the connection configuration
#[derive(Debug, Clone)]
pub struct HandshakeParams {
    pub application: String,
    pub scope: String,
    pub session_ttl_secs: u64,
}

/// Pull the challenge out of an `auth_challenge` result.
///
/// The challenge is the first element of the result array; it may be the
/// challenge string itself or an object carrying `challenge_message`.
pub fn extract_challenge(result: &Value) -> Option<String> {
    let first = match result {
        Value::Array(items) => items.first()?,
        Value::Object(_) => result,
        _ => return None,
    };

    match first {
        Value::String(challenge) if !challenge.is_empty() => Some(challenge.clone()),
        Value::Object(fields) => fields
            .get("challenge_message")
            .or_else(|| fields.get("challengeMessage"))
            .or_else(|| fields.get("challenge"))
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Run the two-step challenge-response handshake on a freshly opened transport.
///
/// Step one announces the wallet and waits for a challenge; step two signs the
/// challenge. Any failure is fatal to the connection attempt.
#[instrument(skip_all, fields(address = %signer.address()))]
pub async fn authenticate(
    registry: &PendingRegistry,
    messages: &RpcMessageFactory,
    signer: &dyn MessageSigner,
    params: &HandshakeParams,
) -> Result<(), ClearNodeError> {
    let address = signer.address().to_string();
    let expires_at =
        (chrono::Utc::now().timestamp() as u64).saturating_add(params.session_ttl_secs);

    let challenge_request = messages.auth_request(&AuthRequestParams {
        address: address.clone(),
        session_key: address,
        application: params.application.clone(),
        expires_at,
        scope: params.scope.clone(),
    });
    let challenge_response = registry.dispatch(&challenge_request, None).await?;

    let challenge =
        extract_challenge(&challenge_response.result).ok_or(ClearNodeError::NoChallengeReceived)?;
    debug!("Challenge received, verifying");

    let verify_request = messages.auth_verify(signer, &challenge)?;
    registry.dispatch(&verify_request, None).await?;

    debug!("Authenticated with ClearNode");
    Ok(())
}
