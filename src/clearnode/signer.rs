use crate::core::errors::ClearNodeError;
use crate::core::kernel::signer::{MessageSigner, SignatureResult};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};
use std::fmt;
use zeroize::Zeroizing;

/// ECDSA signer using secp256k1 (Ethereum-style signatures)
///
/// Signs `keccak256(payload)` without any message prefix and emits the
/// 65-byte `r || s || v` form with `v = 27 + recovery_id`.
#[derive(Clone)]
pub struct EcdsaSigner {
    secret_key: SecretKey,
    address: String,
    secp: Secp256k1<secp256k1::All>,
}

impl fmt::Debug for EcdsaSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcdsaSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl EcdsaSigner {
    pub fn from_private_key(private_key: &str) -> Result<Self, ClearNodeError> {
        let key_bytes = Zeroizing::new(
            hex::decode(private_key.trim().trim_start_matches("0x"))
                .map_err(|e| ClearNodeError::AuthError(format!("Invalid private key hex: {}", e)))?,
        );

        let secret_key = SecretKey::from_slice(&key_bytes)
            .map_err(|e| ClearNodeError::AuthError(format!("Invalid private key: {}", e)))?;

        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);

        Ok(Self {
            secret_key,
            address: public_key_to_address(&public_key),
            secp,
        })
    }
}

impl MessageSigner for EcdsaSigner {
    fn address(&self) -> &str {
        &self.address
    }

    fn sign(&self, payload: &[u8]) -> SignatureResult {
        let hash = keccak256(payload);
        let message = Message::from_digest_slice(&hash)
            .map_err(|e| ClearNodeError::AuthError(format!("Failed to create message: {}", e)))?;

        let signature = self.secp.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut sig_with_recovery = [0u8; 65];
        sig_with_recovery[..64].copy_from_slice(&compact);
        sig_with_recovery[64] = 27 + recovery_id.to_i32() as u8;

        Ok(format!("0x{}", hex::encode(sig_with_recovery)))
    }
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn public_key_to_address(public_key: &PublicKey) -> String {
    let public_key_bytes = public_key.serialize_uncompressed();

    // Remove the 0x04 prefix for uncompressed key
    let hash = keccak256(&public_key_bytes[1..]);
    to_checksum_address(&hex::encode(&hash[12..]))
}

/// EIP-55 mixed-case encoding of a lowercase hex address (no `0x`)
fn to_checksum_address(lower_hex: &str) -> String {
    let hash = keccak256(lower_hex.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");

    for (i, c) in lower_hex.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};

    const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_address_derivation() {
        let signer = EcdsaSigner::from_private_key(HARDHAT_KEY).unwrap();
        assert_eq!(
            signer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );

        let signer = EcdsaSigner::from_private_key(
            "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
        )
        .unwrap();
        assert_eq!(
            signer.address(),
            "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"
        );
    }

    #[test]
    fn test_invalid_keys_are_rejected() {
        assert!(matches!(
            EcdsaSigner::from_private_key("0xnothex"),
            Err(ClearNodeError::AuthError(_))
        ));
        assert!(matches!(
            EcdsaSigner::from_private_key("0x1234"),
            Err(ClearNodeError::AuthError(_))
        ));
    }

    #[test]
    fn test_signature_recovers_to_signer_address() {
        let signer = EcdsaSigner::from_private_key(HARDHAT_KEY).unwrap();
        let payload = br#"[1,"auth_verify",{"challenge":"abc"},1700000000000]"#;

        let signature = signer.sign(payload).unwrap();
        assert!(signature.starts_with("0x"));
        let bytes = hex::decode(&signature[2..]).unwrap();
        assert_eq!(bytes.len(), 65);
        assert!(bytes[64] == 27 || bytes[64] == 28);

        let secp = Secp256k1::new();
        let recovery_id = RecoveryId::from_i32(i32::from(bytes[64] - 27)).unwrap();
        let recoverable = RecoverableSignature::from_compact(&bytes[..64], recovery_id).unwrap();
        let message = Message::from_digest_slice(&keccak256(payload)).unwrap();
        let recovered = secp.recover_ecdsa(&message, &recoverable).unwrap();

        assert_eq!(public_key_to_address(&recovered), signer.address());
    }

    #[test]
    fn test_generated_keys_sign_for_their_own_address() {
        let secp = Secp256k1::new();
        for _ in 0..4 {
            let (secret_key, public_key) = secp.generate_keypair(&mut secp256k1::rand::thread_rng());
            let signer =
                EcdsaSigner::from_private_key(&hex::encode(secret_key.secret_bytes())).unwrap();
            assert_eq!(signer.address(), public_key_to_address(&public_key));

            let payload = br#"[2,"ping",{},1700000000000]"#;
            let bytes = hex::decode(&signer.sign(payload).unwrap()[2..]).unwrap();
            let recovery_id = RecoveryId::from_i32(i32::from(bytes[64] - 27)).unwrap();
            let recoverable =
                RecoverableSignature::from_compact(&bytes[..64], recovery_id).unwrap();
            let message = Message::from_digest_slice(&keccak256(payload)).unwrap();
            assert_eq!(secp.recover_ecdsa(&message, &recoverable).unwrap(), public_key);
        }
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = EcdsaSigner::from_private_key(HARDHAT_KEY).unwrap();
        assert_eq!(signer.sign(b"payload").unwrap(), signer.sign(b"payload").unwrap());
    }

    #[test]
    fn test_debug_hides_secret() {
        let signer = EcdsaSigner::from_private_key(HARDHAT_KEY).unwrap();
        let debug = format!("{:?}", signer);
        assert!(!debug.contains("ac0974bec39a"));
        assert!(debug.contains("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
    }
}
