// src/wallet/key_management.rs
//! Key management for issuers and holders.
//!
//! Keys are secp256k1 (via the `k256` crate). Messages are hashed with
//! SHA-256 and signed with deterministic ECDSA (RFC 6979). Public keys travel
//! as `0x`-prefixed SEC1 compressed hex, signatures as `0x`-prefixed compact
//! 64-byte hex.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::{CredentialError, Result};
use crate::utils::crypto::hash_data;
use crate::utils::serialization::{from_prefixed_hex, to_prefixed_hex};

/// Holds one secp256k1 key pair.
///
/// # Security Notes
/// - The signing key is never serialized or logged
/// - `Clone` copies the secret; keep instances behind `Arc` when sharing
#[derive(Clone)]
pub struct KeyManager {
    signing_key: SigningKey,
    pub verifying_key: VerifyingKey,
}

impl KeyManager {
    /// Generates a fresh key pair from the operating system RNG.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Restores a key pair from a 32-byte hex secret.
    ///
    /// # Errors
    /// `InvalidKey` if the secret is not valid hex or not a valid scalar.
    pub fn from_secret_hex(secret: &str) -> Result<Self> {
        let bytes = from_prefixed_hex(secret, "issuer secret key")?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| CredentialError::InvalidKey(format!("issuer secret key: {e}")))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = *signing_key.verifying_key();
        Self { signing_key, verifying_key }
    }

    /// Compressed public key, `0x` hex.
    pub fn public_key_hex(&self) -> String {
        to_prefixed_hex(self.verifying_key.to_encoded_point(true).as_bytes())
    }

    /// Signs a message using ECDSA (secp256k1) with SHA-256 prehashing.
    ///
    /// # Returns
    /// 64-byte compact signature (R || S) as `0x` hex.
    pub fn sign_message(&self, message: &[u8]) -> Result<String> {
        let hash = hash_data(message);
        let signature: Signature = self
            .signing_key
            .sign_prehash(&hash)
            .map_err(|e| CredentialError::Backend(format!("signing failed: {e}")))?;
        Ok(to_prefixed_hex(&signature.to_bytes()))
    }
}

/// Parses a `0x` hex SEC1 public key.
pub fn parse_public_key(public_key: &str) -> Result<VerifyingKey> {
    let bytes = from_prefixed_hex(public_key, "public key")?;
    VerifyingKey::from_sec1_bytes(&bytes).map_err(|e| CredentialError::InvalidKey(format!("public key: {e}")))
}

/// Checks a compact signature over `message`.
///
/// Returns `Ok(false)` for a well-formed signature that does not verify.
///
/// # Errors
/// `InvalidKey` if the key or signature cannot be parsed.
pub fn verify_signature(public_key: &str, message: &[u8], signature: &str) -> Result<bool> {
    let key = parse_public_key(public_key)?;
    let sig_bytes = from_prefixed_hex(signature, "signature")?;
    let signature = Signature::from_slice(&sig_bytes)
        .map_err(|e| CredentialError::InvalidKey(format!("signature: {e}")))?;
    Ok(key.verify_prehash(&hash_data(message), &signature).is_ok())
}

/// Normalizes a public key to its canonical compressed hex form.
pub fn canonical_public_key(public_key: &str) -> Result<String> {
    let key = parse_public_key(public_key)?;
    Ok(to_prefixed_hex(key.to_encoded_point(true).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keys = KeyManager::generate();
        let signature = keys.sign_message(b"hello").unwrap();
        assert!(verify_signature(&keys.public_key_hex(), b"hello", &signature).unwrap());
        assert!(!verify_signature(&keys.public_key_hex(), b"hullo", &signature).unwrap());
    }

    #[test]
    fn test_other_key_does_not_verify() {
        let alice = KeyManager::generate();
        let mallory = KeyManager::generate();
        let signature = mallory.sign_message(b"revoke").unwrap();
        assert!(!verify_signature(&alice.public_key_hex(), b"revoke", &signature).unwrap());
    }

    #[test]
    fn test_public_key_format() {
        let keys = KeyManager::generate();
        let pk = keys.public_key_hex();
        assert!(pk.starts_with("0x02") || pk.starts_with("0x03"));
        assert_eq!(pk.len(), 2 + 66);
        assert_eq!(canonical_public_key(&pk.to_uppercase().replace("0X", "0x")).unwrap(), pk);
    }

    #[test]
    fn test_restore_from_secret() {
        let secret = "0x".to_string() + &"01".repeat(32);
        let a = KeyManager::from_secret_hex(&secret).unwrap();
        let b = KeyManager::from_secret_hex(&secret).unwrap();
        assert_eq!(a.public_key_hex(), b.public_key_hex());
        assert!(KeyManager::from_secret_hex("0x00").is_err());
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(matches!(parse_public_key("0x1234"), Err(CredentialError::InvalidKey(_))));
        let keys = KeyManager::generate();
        assert!(verify_signature(&keys.public_key_hex(), b"m", "0xdead").is_err());
    }
}
