// src/zkp/proof_contract.rs
//! Boundary between this engine and an external proving system.
//!
//! [`build_circuit_inputs`] shapes a credential and disclosure scope into the
//! private witness and the canonical public inputs. It performs no proving.
//! Proving and verification are delegated to implementations of
//! [`ProvingBackend`] and [`ProofVerifier`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::commitment::commit;
use super::disclosure_codec::{encode, EncodedScope};
use super::field_codec::FieldElement;
use super::public_inputs::{PublicInputs, LAYOUT_VERSION};
use crate::error::{CredentialError, Result};
use crate::models::{Credential, CredentialKind, DisclosureScope};
use crate::utils::crypto::hash_data;
use crate::utils::serialization::{prefixed_hex, to_prefixed_hex};
use crate::wallet::key_management::canonical_public_key;

/// Private witness handed to the prover. Never leaves the holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Witness {
    pub domain_tag: FieldElement,
    /// Every attribute in schema order.
    pub fields: Vec<FieldElement>,
    pub nonce: FieldElement,
    pub salt: FieldElement,
    pub credential_id: FieldElement,
}

/// Everything an external prover needs for one presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitInputs {
    pub credential_type: CredentialKind,
    pub layout_version: u32,
    pub witness: Witness,
    pub public_inputs: Vec<FieldElement>,
}

/// Builds circuit inputs for a presentation.
///
/// # Arguments
/// * `credential` - Full credential held by the prover
/// * `scope` - Fields to disclose and predicates to prove
/// * `issuer_public_key` - Key of the issuer that signed the commitment, any
///   SEC1 spelling; it is hashed in canonical compressed form
/// * `now` - Presentation time, Unix seconds
///
/// # Errors
/// * `InvalidKey` if the issuer key does not parse
/// * Any encoding error from the disclosure codec or the commitment engine
pub fn build_circuit_inputs(
    credential: &Credential,
    scope: &DisclosureScope,
    issuer_public_key: &str,
    now: i64,
) -> Result<CircuitInputs> {
    let schema = credential.schema();
    let EncodedScope { bitmap, predicates } = encode(scope, schema)?;
    let commitment = commit(credential)?;
    let issuer_public_key = canonical_public_key(issuer_public_key)?;
    let current_timestamp = u64::try_from(now).map_err(|_| CredentialError::OutOfRange {
        value: now.to_string(),
        context: "currentTimestamp".into(),
    })?;

    let public_inputs = PublicInputs {
        credential_id: credential.credential_id_field(),
        commitment,
        bitmap,
        issuer_public_key: FieldElement::hash_text(&issuer_public_key),
        holder_public_key: FieldElement::hash_text(credential.holder_public_key()),
        predicates,
        current_timestamp,
    };

    let witness = Witness {
        domain_tag: FieldElement::from_u64(schema.domain_tag()),
        fields: credential.canonical_fields()?,
        nonce: credential.nonce_field()?,
        salt: credential.salt_field()?,
        credential_id: credential.credential_id_field(),
    };

    Ok(CircuitInputs {
        credential_type: schema.kind,
        layout_version: LAYOUT_VERSION,
        witness,
        public_inputs: public_inputs.to_vec(),
    })
}

/// Output of an external prover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOutput {
    pub proof_bytes: Vec<u8>,
    pub public_inputs: Vec<FieldElement>,
}

/// External proving system.
///
/// Implementations may be slow; callers own timeouts and cancellation.
pub trait ProvingBackend: Send + Sync {
    fn prove(&self, inputs: &CircuitInputs) -> Result<ProofOutput>;
}

/// External verifier for proofs produced by a [`ProvingBackend`].
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, kind: CredentialKind, proof_bytes: &[u8], public_inputs: &[FieldElement]) -> Result<bool>;
}

/// A presentation as sent to a verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZKProof {
    #[serde(with = "prefixed_hex")]
    pub proof_bytes: Vec<u8>,
    pub public_inputs: Vec<FieldElement>,
    pub credential_type: CredentialKind,
    /// Revealed attribute values keyed by schema field name.
    pub disclosed_fields: BTreeMap<String, Value>,
    pub verifier_contract_address: String,
    #[serde(default = "default_layout_version")]
    pub layout_version: u32,
}

fn default_layout_version() -> u32 {
    LAYOUT_VERSION
}

/// Calldata for an on-chain verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainCalldata {
    /// Lowercase hex with `0x` prefix.
    pub proof_bytes: String,
    /// Decimal field elements in canonical order.
    pub public_inputs: Vec<String>,
}

/// Encodes a proof for an on-chain verifier call.
pub fn format_for_chain(proof: &ZKProof) -> ChainCalldata {
    ChainCalldata {
        proof_bytes: to_prefixed_hex(&proof.proof_bytes),
        public_inputs: proof.public_inputs.iter().map(ToString::to_string).collect(),
    }
}

const DIGEST_DOMAIN: &[u8] = b"zkcred-digest-backend-v1";

/// Development backend that binds a transcript digest to the public inputs.
///
/// It proves nothing about the witness and is not zero-knowledge. It exists
/// so the presentation pipeline can run without a SNARK toolchain.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestBackend;

impl DigestBackend {
    fn transcript(kind: CredentialKind, public_inputs: &[FieldElement]) -> [u8; 32] {
        let mut data = DIGEST_DOMAIN.to_vec();
        data.extend_from_slice(kind.as_str().as_bytes());
        for input in public_inputs {
            data.extend_from_slice(&input.to_bytes_be());
        }
        hash_data(&data)
    }
}

impl ProvingBackend for DigestBackend {
    fn prove(&self, inputs: &CircuitInputs) -> Result<ProofOutput> {
        Ok(ProofOutput {
            proof_bytes: Self::transcript(inputs.credential_type, &inputs.public_inputs).to_vec(),
            public_inputs: inputs.public_inputs.clone(),
        })
    }
}

impl ProofVerifier for DigestBackend {
    fn verify(&self, kind: CredentialKind, proof_bytes: &[u8], public_inputs: &[FieldElement]) -> Result<bool> {
        let expected = Self::transcript(kind, public_inputs);
        Ok(crate::utils::crypto::constant_time_eq(&expected, proof_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::fixtures::*;

    #[test]
    fn test_public_inputs_carry_commitment_and_bitmap() {
        let credential = college_credential();
        let scope = DisclosureScope::new(["institutionName"], ["age_over_18", "status_active"]);
        let inputs = build_circuit_inputs(&credential, &scope, &issuer_key(), NOW).unwrap();

        let parsed = PublicInputs::parse(&inputs.public_inputs, credential.schema()).unwrap();
        assert_eq!(parsed.commitment, commit(&credential).unwrap());
        assert_eq!(parsed.bitmap, 0b10);
        assert_eq!(parsed.predicates.flags(), vec![1, 0, 1]);
        assert_eq!(parsed.current_timestamp, NOW as u64);
        assert_eq!(parsed.holder_public_key, FieldElement::hash_text("0x02holder"));
        assert_eq!(parsed.issuer_public_key, FieldElement::hash_text(&issuer_key()));
        assert_eq!(inputs.witness.fields.len(), 12);
        assert_eq!(inputs.layout_version, LAYOUT_VERSION);
    }

    #[test]
    fn test_issuer_key_spelling_does_not_change_inputs() {
        let credential = college_credential();
        let scope = DisclosureScope::default();
        let canonical = build_circuit_inputs(&credential, &scope, &issuer_key(), NOW).unwrap();
        let respelled = issuer_key().trim_start_matches("0x").to_uppercase();
        let other = build_circuit_inputs(&credential, &scope, &respelled, NOW).unwrap();
        assert_eq!(canonical.public_inputs, other.public_inputs);

        let err = build_circuit_inputs(&credential, &scope, "0x02issuer", NOW).unwrap_err();
        assert!(matches!(err, CredentialError::InvalidKey(_)));
    }

    #[test]
    fn test_negative_time_is_rejected() {
        let credential = college_credential();
        let err = build_circuit_inputs(&credential, &DisclosureScope::default(), &issuer_key(), -5).unwrap_err();
        assert!(matches!(err, CredentialError::OutOfRange { .. }));
    }

    #[test]
    fn test_format_for_chain() {
        let proof = ZKProof {
            proof_bytes: vec![0xAB, 0xCD],
            public_inputs: vec![FieldElement::from_u64(12), FieldElement::zero()],
            credential_type: CredentialKind::CollegeId,
            disclosed_fields: BTreeMap::new(),
            verifier_contract_address: "0x0".into(),
            layout_version: LAYOUT_VERSION,
        };
        let calldata = format_for_chain(&proof);
        assert_eq!(calldata.proof_bytes, "0xabcd");
        assert_eq!(calldata.public_inputs, vec!["12".to_string(), "0".to_string()]);

        let json = serde_json::to_string(&proof).unwrap();
        let back: ZKProof = serde_json::from_str(&json).unwrap();
        assert_eq!(back, proof);
    }

    #[test]
    fn test_digest_backend_binds_public_inputs() {
        let credential = college_credential();
        let inputs = build_circuit_inputs(&credential, &DisclosureScope::default(), "k", NOW).unwrap();
        let output = DigestBackend.prove(&inputs).unwrap();
        assert!(DigestBackend
            .verify(CredentialKind::CollegeId, &output.proof_bytes, &output.public_inputs)
            .unwrap());

        let mut tampered = output.public_inputs.clone();
        tampered[2] = FieldElement::from_u64(1);
        assert!(!DigestBackend
            .verify(CredentialKind::CollegeId, &output.proof_bytes, &tampered)
            .unwrap());
    }
}
