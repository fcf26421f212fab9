// src/zkp/commitment.rs
//! Credential commitments.
//!
//! `commit` absorbs, in order: the schema domain tag, every attribute in
//! schema order, the nonce, the salt and the credential identifier. The
//! result is binding on all of them. It hides the attributes only while the
//! nonce and salt stay secret.

use log::debug;

use super::field_codec::{hex_to_field, FieldElement};
use super::poseidon::poseidon_hash;
use crate::error::Result;
use crate::models::Credential;
use crate::utils::crypto::constant_time_eq;

/// Computes the commitment for a credential.
///
/// # Errors
/// `MalformedCredential` if required fields are missing or the freshness
/// material is not hex, and `OutOfRange` for unencodable numbers.
pub fn commit(credential: &Credential) -> Result<FieldElement> {
    let nonce = credential.nonce_field()?;
    let salt = credential.salt_field()?;
    commit_with(credential, nonce, salt)
}

fn commit_with(credential: &Credential, nonce: FieldElement, salt: FieldElement) -> Result<FieldElement> {
    let schema = credential.schema();
    let fields = credential.canonical_fields()?;

    let mut inputs = Vec::with_capacity(fields.len() + 4);
    inputs.push(FieldElement::from_u64(schema.domain_tag()));
    inputs.extend(fields);
    inputs.push(nonce);
    inputs.push(salt);
    inputs.push(credential.credential_id_field());

    Ok(poseidon_hash(&inputs))
}

/// Recomputes the commitment from an opening and compares in constant time.
///
/// The `nonce` and `salt` arguments override those stored on the credential,
/// so an opening can be checked against material received separately.
pub fn verify_opening(commitment: &FieldElement, credential: &Credential, nonce: &str, salt: &str) -> Result<bool> {
    let recomputed = commit_with(credential, hex_to_field(nonce, "nonce")?, hex_to_field(salt, "salt")?)?;
    let matches = constant_time_eq(&recomputed.to_bytes_be(), &commitment.to_bytes_be());
    if !matches {
        debug!("Commitment opening mismatch for credential {}", credential.credential_id);
    }
    Ok(matches)
}
