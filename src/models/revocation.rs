// src/models/revocation.rs
//! Revocation ledger records.
//!
//! Both record types are append-only: once written they are never updated or
//! removed. Both are signed by the issuer they name, so a replica can check
//! them without trusting whoever relayed them.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::crypto::{domain_message, hash_data};
use crate::wallet::KeyManager;
use crate::zkp::FieldElement;

const REVOCATION_DOMAIN: &str = "zkcred-revocation-v1";
const ISSUANCE_RECORD_DOMAIN: &str = "zkcred-issuance-record-v1";

/// A signed statement that a credential is no longer valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationEvent {
    pub credential_id: String,
    /// Key of the issuer revoking the credential, `0x` hex.
    pub issuer_public_key: String,
    /// Unix seconds.
    pub revoked_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Compact ECDSA signature over [`RevocationEvent::signing_message`], `0x` hex.
    pub issuer_signature: String,
}

impl RevocationEvent {
    /// Builds an event signed by `keys`.
    pub fn signed(keys: &KeyManager, credential_id: &str, revoked_at: i64, reason: Option<String>) -> Result<Self> {
        let issuer_public_key = keys.public_key_hex();
        let message = Self::signing_message(credential_id, &issuer_public_key, revoked_at, reason.as_deref());
        Ok(Self {
            credential_id: credential_id.to_string(),
            issuer_signature: keys.sign_message(&message)?,
            issuer_public_key,
            revoked_at,
            reason,
        })
    }

    /// Bytes the issuer signs.
    pub fn signing_message(
        credential_id: &str,
        issuer_public_key: &str,
        revoked_at: i64,
        reason: Option<&str>,
    ) -> Vec<u8> {
        domain_message(
            REVOCATION_DOMAIN,
            &[
                credential_id.as_bytes(),
                issuer_public_key.as_bytes(),
                &revoked_at.to_be_bytes(),
                &[u8::from(reason.is_some())],
                reason.unwrap_or_default().as_bytes(),
            ],
        )
    }

    pub fn message(&self) -> Vec<u8> {
        Self::signing_message(
            &self.credential_id,
            &self.issuer_public_key,
            self.revoked_at,
            self.reason.as_deref(),
        )
    }

    /// Content address: SHA-256 of the canonical JSON encoding, hex.
    pub fn event_id(&self) -> String {
        // Field order is fixed by the struct, so the encoding is canonical.
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(hash_data(&encoded))
    }
}

/// Binds a credential to the issuer allowed to revoke it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceRecord {
    pub credential_id: String,
    pub issuer_public_key: String,
    pub commitment: FieldElement,
    /// Compact ECDSA signature over [`IssuanceRecord::signing_message`], `0x` hex.
    pub issuer_signature: String,
}

impl IssuanceRecord {
    /// Builds a record signed by `keys`.
    pub fn signed(keys: &KeyManager, credential_id: &str, commitment: FieldElement) -> Result<Self> {
        let issuer_public_key = keys.public_key_hex();
        let message = Self::signing_message(credential_id, &issuer_public_key, &commitment);
        Ok(Self {
            credential_id: credential_id.to_string(),
            issuer_signature: keys.sign_message(&message)?,
            issuer_public_key,
            commitment,
        })
    }

    /// Bytes the issuer signs.
    pub fn signing_message(credential_id: &str, issuer_public_key: &str, commitment: &FieldElement) -> Vec<u8> {
        domain_message(
            ISSUANCE_RECORD_DOMAIN,
            &[
                credential_id.as_bytes(),
                issuer_public_key.as_bytes(),
                &commitment.to_bytes_be(),
            ],
        )
    }

    pub fn message(&self) -> Vec<u8> {
        Self::signing_message(&self.credential_id, &self.issuer_public_key, &self.commitment)
    }
}
