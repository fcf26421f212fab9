// src/utils/serialization.rs
//! Serialization utilities.
//!
//! Provides `0x`-prefixed lowercase hex encoding for byte strings on the
//! wire, and serde adapters for hex and base64 byte fields.

use crate::error::{CredentialError, Result};

/// Encodes bytes as lowercase hex with a `0x` prefix.
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decodes hex with or without a `0x` prefix.
///
/// # Errors
/// Returns [`CredentialError::InvalidKey`] naming `what` when the input is not hex.
pub fn from_prefixed_hex(value: &str, what: &str) -> Result<Vec<u8>> {
    let trimmed = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(trimmed).map_err(|e| CredentialError::InvalidKey(format!("{what}: {e}")))
}

/// serde adapter storing `Vec<u8>` as `0x` hex.
pub mod prefixed_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::to_prefixed_hex(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let value = String::deserialize(d)?;
        let trimmed = value.strip_prefix("0x").unwrap_or(&value);
        hex::decode(trimmed).map_err(serde::de::Error::custom)
    }
}

/// serde adapter storing `Vec<u8>` as standard base64.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let value = String::deserialize(d)?;
        base64::decode(value).map_err(serde::de::Error::custom)
    }
}
