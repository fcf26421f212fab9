// src/zkp/field_codec.rs
//! Deterministic mapping of credential values into the BN254 scalar field.
//!
//! Text and enum labels are hashed with SHA-256 and reduced modulo the field
//! order. Integers and timestamps pass through unchanged. Booleans and
//! two-state statuses become 0 or 1.
//!
//! Field elements cross every wire boundary as decimal strings.

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{CredentialError, Result};
use crate::utils::crypto::hash_data;

/// A canonical element of the proving field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldElement(pub Fr);

impl FieldElement {
    pub fn zero() -> Self {
        Self(Fr::from(0u64))
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Fr::from(value))
    }

    pub fn from_bool(value: bool) -> Self {
        Self::from_u64(u64::from(value))
    }

    /// Hashes arbitrary bytes into the field (SHA-256, big-endian, reduced).
    pub fn hash_bytes(bytes: &[u8]) -> Self {
        Self(Fr::from_be_bytes_mod_order(&hash_data(bytes)))
    }

    /// Hashes a UTF-8 string into the field.
    pub fn hash_text(text: &str) -> Self {
        Self::hash_bytes(text.as_bytes())
    }

    /// Reduces raw bytes into the field without hashing them first.
    pub fn from_be_bytes_reduced(bytes: &[u8]) -> Self {
        Self(Fr::from_be_bytes_mod_order(bytes))
    }

    /// Big-endian 32-byte canonical encoding.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        let bytes = self.0.into_bigint().to_bytes_be();
        let mut out = vec![0u8; 32usize.saturating_sub(bytes.len())];
        out.extend_from_slice(&bytes);
        out
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0.into_bigint().to_bytes_be())
    }

    /// Parses a decimal string, rejecting anything that is not already reduced.
    ///
    /// # Errors
    /// * `MalformedPublicInputs` when the text is not a decimal integer
    /// * `OutOfRange` when the integer is not below the field modulus
    pub fn from_decimal(text: &str) -> Result<Self> {
        let value = BigUint::from_str(text.trim()).map_err(|_| {
            CredentialError::MalformedPublicInputs(format!("`{text}` is not a decimal field element"))
        })?;
        let modulus: BigUint = Fr::MODULUS.into();
        if value >= modulus {
            return Err(CredentialError::OutOfRange {
                value: text.to_string(),
                context: "field element".into(),
            });
        }
        Ok(Self(Fr::from(value)))
    }

    /// Interprets the element as a `u64`, if it fits.
    pub fn to_u64(&self) -> Option<u64> {
        let digits = self.to_biguint().to_u64_digits();
        match digits.as_slice() {
            [] => Some(0),
            [single] => Some(*single),
            _ => None,
        }
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({self})")
    }
}

impl From<Fr> for FieldElement {
    fn from(value: Fr) -> Self {
        Self(value)
    }
}

impl FromStr for FieldElement {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_decimal(s)
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(d)?;
        Self::from_decimal(&text).map_err(serde::de::Error::custom)
    }
}

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    /// Unix seconds.
    Timestamp,
    Boolean,
    /// Closed label set, hashed like text.
    Enum(&'static [&'static str]),
    /// Two-state label stored as a boolean; the first label encodes as 1.
    Status(&'static str, &'static str),
}

/// A raw credential value before field encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
}

impl FieldValue {
    /// Lifts a JSON scalar into a [`FieldValue`].
    pub fn from_json(value: &Value, context: &str) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Self::Text(s.clone())),
            Value::Bool(b) => Ok(Self::Boolean(*b)),
            Value::Number(n) => n.as_i64().map(Self::Integer).ok_or_else(|| CredentialError::OutOfRange {
                value: n.to_string(),
                context: context.to_string(),
            }),
            other => Err(CredentialError::MalformedCredential(format!(
                "`{context}` must be a scalar, got {other}"
            ))),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

/// Maps a value into the field according to its declared type.
///
/// # Arguments
/// * `value` - Raw value taken from a credential or a disclosure
/// * `declared` - The schema type of the field
/// * `context` - Field name used in error messages
///
/// # Errors
/// * `OutOfRange` for negative integers or timestamps
/// * `MalformedCredential` when the value does not match the declared type
pub fn to_field(value: &FieldValue, declared: FieldType, context: &str) -> Result<FieldElement> {
    match (value, declared) {
        (FieldValue::Text(s), FieldType::Text) => Ok(FieldElement::hash_text(s)),
        (FieldValue::Text(s), FieldType::Enum(labels)) => {
            if labels.contains(&s.as_str()) {
                Ok(FieldElement::hash_text(s))
            } else {
                Err(CredentialError::MalformedCredential(format!(
                    "`{context}` must be one of {labels:?}, got `{s}`"
                )))
            }
        }
        (FieldValue::Text(s), FieldType::Status(on, off)) => {
            if s == on {
                Ok(FieldElement::from_bool(true))
            } else if s == off {
                Ok(FieldElement::from_bool(false))
            } else {
                Err(CredentialError::MalformedCredential(format!(
                    "`{context}` must be `{on}` or `{off}`, got `{s}`"
                )))
            }
        }
        (FieldValue::Boolean(b), FieldType::Boolean | FieldType::Status(..)) => Ok(FieldElement::from_bool(*b)),
        (FieldValue::Integer(n), FieldType::Integer | FieldType::Timestamp) => {
            u64::try_from(*n)
                .map(FieldElement::from_u64)
                .map_err(|_| CredentialError::OutOfRange {
                    value: n.to_string(),
                    context: context.to_string(),
                })
        }
        (value, declared) => Err(CredentialError::MalformedCredential(format!(
            "`{context}` expected {declared:?}, got {value:?}"
        ))),
    }
}

/// Encodes a hex string (optionally `0x`-prefixed) of random bytes into the field.
///
/// Used for nonce and salt material.
pub fn hex_to_field(hex_str: &str, context: &str) -> Result<FieldElement> {
    let trimmed = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(trimmed)
        .map_err(|e| CredentialError::MalformedCredential(format!("`{context}` is not hex: {e}")))?;
    if bytes.is_empty() {
        return Err(CredentialError::MalformedCredential(format!("`{context}` is empty")));
    }
    Ok(FieldElement::from_be_bytes_reduced(&bytes))
}
