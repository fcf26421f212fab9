// src/utils/crypto.rs
//! Cryptographic utilities shared across the engine.
//!
//! SHA-256 (via `ring`) is the general-purpose digest used for mapping text
//! into the proving field, for content-addressing ledger events and for
//! building domain-separated signing messages. It is never used for the
//! commitment itself; see [`crate::zkp::poseidon`].

use ring::constant_time::verify_slices_are_equal;
use ring::digest::{digest, SHA256};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{CredentialError, Result};

/// Computes a SHA-256 hash of the input data.
///
/// # Arguments
/// * `data` - Binary data to hash
///
/// # Returns
/// Fixed-size 32-byte array containing the digest.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(digest(&SHA256, data).as_ref());
    out
}

/// Fills a fresh buffer of `N` bytes from the system CSPRNG.
///
/// # Errors
/// Returns [`CredentialError::Backend`] if the operating system RNG fails.
pub fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| CredentialError::Backend("system RNG unavailable".into()))?;
    Ok(buf)
}

/// Generates a 32-byte random value rendered as lowercase hex.
///
/// Used for per-issuance nonces and salts.
pub fn random_hex_32() -> Result<String> {
    Ok(hex::encode(random_bytes::<32>()?))
}

/// Compares two byte slices in constant time.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    verify_slices_are_equal(a, b).is_ok()
}

/// Builds a domain-separated message from length-prefixed parts.
///
/// Each part is prefixed with its big-endian `u32` length so that no two
/// distinct part lists can produce the same byte string.
pub fn domain_message(domain: &str, parts: &[&[u8]]) -> Vec<u8> {
    let mut message = Vec::with_capacity(domain.len() + parts.iter().map(|p| p.len() + 4).sum::<usize>());
    message.extend_from_slice(domain.as_bytes());
    for part in parts {
        message.extend_from_slice(&(part.len() as u32).to_be_bytes());
        message.extend_from_slice(part);
    }
    message
}
