// src/services/credential_issuer.rs
//! Credential Issuer Service
//!
//! Issues signed credentials and authors revocations for them.
//!
//! Issuance assigns a fresh id, nonce and salt, commits to the credential,
//! signs `(commitment, holderPublicKey, expiresAt)` and records in the
//! revocation ledger that this issuer may later revoke it.

use std::sync::Arc;

use chrono::Utc;
use log::info;

use crate::error::{CredentialError, Result};
use crate::models::{Credential, CredentialAttributes, IssuanceRecord, RevocationEvent, SignedCredential};
use crate::storage::{AppendOutcome, RevocationLedger};
use crate::utils::crypto::{constant_time_eq, domain_message, random_hex_32};
use crate::wallet::key_management::{verify_signature, KeyManager};
use crate::zkp::commitment::commit;
use crate::zkp::FieldElement;

const ISSUANCE_DOMAIN: &str = "zkcred-issuance-v1";

/// Bytes an issuer signs for a credential.
pub fn issuance_message(commitment: &FieldElement, holder_public_key: &str, expires_at: i64) -> Vec<u8> {
    domain_message(
        ISSUANCE_DOMAIN,
        &[
            &commitment.to_bytes_be(),
            holder_public_key.as_bytes(),
            &expires_at.to_be_bytes(),
        ],
    )
}

/// Service holding one issuer key.
pub struct CredentialIssuer {
    keys: KeyManager,
    ledger: Arc<RevocationLedger>,
}

impl CredentialIssuer {
    /// Creates a new issuer bound to a shared ledger replica.
    pub fn new(keys: KeyManager, ledger: Arc<RevocationLedger>) -> Self {
        Self { keys, ledger }
    }

    pub fn public_key(&self) -> String {
        self.keys.public_key_hex()
    }

    /// Issues a credential.
    ///
    /// # Arguments
    /// * `attributes` - Kind-specific attribute values
    ///
    /// # Returns
    /// The signed credential, ready to hand to the holder.
    ///
    /// # Errors
    /// `MalformedCredential` or `OutOfRange` if the attributes do not satisfy
    /// the kind's schema.
    pub fn issue(&self, attributes: CredentialAttributes) -> Result<SignedCredential> {
        let credential = Credential {
            credential_id: uuid::Uuid::new_v4().to_string(),
            nonce: random_hex_32()?,
            salt: random_hex_32()?,
            attributes,
        };
        credential.validate()?;

        let commitment = commit(&credential)?;
        let message = issuance_message(&commitment, credential.holder_public_key(), credential.expires_at());
        let signature = self.keys.sign_message(&message)?;
        let issuer_public_key = self.public_key();

        self.ledger
            .record_issuance(&IssuanceRecord::signed(&self.keys, &credential.credential_id, commitment)?)?;

        info!("Issued {} credential {}", credential.kind(), credential.credential_id);
        Ok(SignedCredential {
            credential,
            commitment,
            issuer_public_key,
            signature,
        })
    }

    /// Revokes a credential this issuer issued, timestamped now.
    pub fn revoke(&self, credential_id: &str, reason: Option<String>) -> Result<RevocationEvent> {
        self.revoke_at(credential_id, reason, Utc::now().timestamp())
    }

    /// Revokes a credential with an explicit timestamp.
    ///
    /// # Errors
    /// `UnauthorizedRevocation` if the ledger holds no issuance record from
    /// this issuer for the credential.
    pub fn revoke_at(&self, credential_id: &str, reason: Option<String>, revoked_at: i64) -> Result<RevocationEvent> {
        let event = RevocationEvent::signed(&self.keys, credential_id, revoked_at, reason)?;
        match self.ledger.append(event.clone())? {
            AppendOutcome::Recorded => info!("Issuer revoked {credential_id}"),
            outcome => info!("Issuer revocation of {credential_id}: {outcome:?}"),
        }
        Ok(event)
    }
}

/// Checks that a signed credential's commitment matches its contents and that
/// the issuer signature covers it.
///
/// # Errors
/// * `InvalidKey` if the issuer key or signature does not parse
/// * Any commitment error for a malformed credential
pub fn verify_issuance(signed: &SignedCredential) -> Result<bool> {
    let credential = &signed.credential;
    let recomputed = commit(credential)?;
    if !constant_time_eq(&recomputed.to_bytes_be(), &signed.commitment.to_bytes_be()) {
        return Ok(false);
    }
    let message = issuance_message(&signed.commitment, credential.holder_public_key(), credential.expires_at());
    verify_signature(&signed.issuer_public_key, &message, &signed.signature)
}

/// Like [`verify_issuance`] but turns a mismatch into an error.
pub fn require_valid_issuance(signed: &SignedCredential) -> Result<()> {
    if verify_issuance(signed)? {
        Ok(())
    } else {
        Err(CredentialError::ProofRejected(format!(
            "issuer attestation for `{}` does not verify",
            signed.credential_id()
        )))
    }
}
