use crate::core::errors::ClearNodeError;

/// Result type for signing operations: `0x`-prefixed hex signature
pub type SignatureResult = Result<String, ClearNodeError>;

/// Capability that signs protocol payloads with a bound private credential
///
/// Implementations hold no per-call state, so one signer may be shared across
/// concurrently running requests.
pub trait MessageSigner: Send + Sync {
    /// Public address derived from the credential
    fn address(&self) -> &str;

    /// Sign the serialized payload bytes
    fn sign(&self, payload: &[u8]) -> SignatureResult;
}
