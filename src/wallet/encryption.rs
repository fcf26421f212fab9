// src/wallet/encryption.rs
//! At-rest encryption for stored credentials.
//!
//! A 256-bit key is derived with HKDF-SHA256 from the holder's public key and
//! a store-wide salt, then used with AES-256-GCM. Each write draws a fresh
//! 96-bit IV, and blobs are laid out as `iv || ciphertext || tag`.
//!
//! The holder public key is not secret, so anyone who knows it and the store
//! salt can derive the key. Deployments that need confidentiality against such
//! parties must swap the key input for holder-private material (for example an
//! ECDH shared secret) before relying on this layer.

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::hkdf::{Salt, HKDF_SHA256};

use crate::error::{CredentialError, Result};
use crate::utils::crypto::random_bytes;

const KDF_INFO: &[u8] = b"zkcred-credential-store-v1";

/// Derives the store key for one holder.
pub fn derive_holder_key(holder_public_key: &str, kdf_salt: &[u8]) -> Result<LessSafeKey> {
    let ikm = holder_public_key.trim().to_ascii_lowercase();
    let prk = Salt::new(HKDF_SHA256, kdf_salt).extract(ikm.as_bytes());
    let okm = prk
        .expand(&[KDF_INFO], &AES_256_GCM)
        .map_err(|_| CredentialError::Encryption("key derivation".into()))?;
    Ok(LessSafeKey::new(UnboundKey::from(okm)))
}

/// Encrypts `plaintext`, binding `aad`, under a fresh IV.
pub fn seal(key: &LessSafeKey, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let iv = random_bytes::<NONCE_LEN>()?;
    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(Nonce::assume_unique_for_key(iv), Aad::from(aad), &mut in_out)
        .map_err(|_| CredentialError::Encryption(String::from_utf8_lossy(aad).into_owned()))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&in_out);
    Ok(blob)
}

/// Decrypts a blob produced by [`seal`].
///
/// # Errors
/// `Decryption` for a wrong key, a different `aad`, or a corrupted blob.
pub fn open(key: &LessSafeKey, blob: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let label = || CredentialError::Decryption(String::from_utf8_lossy(aad).into_owned());
    if blob.len() < NONCE_LEN + AES_256_GCM.tag_len() {
        return Err(label());
    }
    let (iv, sealed) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(iv).map_err(|_| label())?;
    let mut buf = sealed.to_vec();
    let plaintext = key.open_in_place(nonce, Aad::from(aad), &mut buf).map_err(|_| label())?;
    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: &[u8] = b"test-salt";

    #[test]
    fn test_round_trip() {
        let key = derive_holder_key("0x02holder", SALT).unwrap();
        let blob = seal(&key, b"secret credential", b"cred-1").unwrap();
        assert_eq!(open(&key, &blob, b"cred-1").unwrap(), b"secret credential");
    }

    #[test]
    fn test_fresh_iv_per_write() {
        let key = derive_holder_key("0x02holder", SALT).unwrap();
        let a = seal(&key, b"same", b"id").unwrap();
        let b = seal(&key, b"same", b"id").unwrap();
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
    }

    #[test]
    fn test_wrong_holder_fails() {
        let key = derive_holder_key("0x02holder", SALT).unwrap();
        let other = derive_holder_key("0x03someone", SALT).unwrap();
        let blob = seal(&key, b"secret", b"cred-1").unwrap();
        assert!(matches!(open(&other, &blob, b"cred-1"), Err(CredentialError::Decryption(_))));
    }

    #[test]
    fn test_salt_separates_stores() {
        let key = derive_holder_key("0x02holder", SALT).unwrap();
        let other = derive_holder_key("0x02holder", b"other-salt").unwrap();
        let blob = seal(&key, b"secret", b"cred-1").unwrap();
        assert!(open(&other, &blob, b"cred-1").is_err());
    }

    #[test]
    fn test_aad_and_tamper_detection() {
        let key = derive_holder_key("0x02holder", SALT).unwrap();
        let mut blob = seal(&key, b"secret", b"cred-1").unwrap();
        assert!(open(&key, &blob, b"cred-2").is_err());
        let last = blob.len() - 1;
        blob[last] ^= 1;
        assert!(open(&key, &blob, b"cred-1").is_err());
        assert!(open(&key, &blob[..10], b"cred-1").is_err());
    }

    #[test]
    fn test_key_input_is_case_insensitive() {
        let lower = derive_holder_key("0xabcdef", SALT).unwrap();
        let upper = derive_holder_key("0xABCDEF", SALT).unwrap();
        let blob = seal(&lower, b"x", b"id").unwrap();
        assert_eq!(open(&upper, &blob, b"id").unwrap(), b"x");
    }
}
