// src/services/verifier.rs
//! Presentation verification service.
//!
//! The verifier never sees the credential. It works only from the proof's
//! public inputs, the disclosed values and the revocation ledger. The proof
//! bytes themselves go to an external [`ProofVerifier`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CredentialError, Result};
use crate::models::{CredentialKind, PredicateId};
use crate::storage::RevocationLedger;
use crate::wallet::key_management::canonical_public_key;
use crate::zkp::disclosure_codec::decode;
use crate::zkp::field_codec::{to_field, FieldValue};
use crate::zkp::public_inputs::{PublicInputs, LAYOUT_VERSION};
use crate::zkp::{FieldElement, ProofVerifier, ZKProof};

/// Acceptance rules applied on top of the proof itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierPolicy {
    /// Oldest acceptable `currentTimestamp`, in seconds before now.
    pub max_proof_age_secs: i64,
    /// Allowed clock skew for timestamps ahead of now.
    pub max_clock_skew_secs: i64,
    /// Accepted issuer keys in any SEC1 hex spelling; empty accepts any issuer.
    pub trusted_issuers: Vec<String>,
}

impl Default for VerifierPolicy {
    fn default() -> Self {
        Self {
            max_proof_age_secs: 300,
            max_clock_skew_secs: 30,
            trusted_issuers: Vec::new(),
        }
    }
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub credential_type: CredentialKind,
    /// Credential id when this ledger replica knows it.
    pub credential_id: Option<String>,
    pub commitment: FieldElement,
    pub disclosed_fields: BTreeMap<String, Value>,
    pub proven_predicates: Vec<PredicateId>,
    /// Public comparison values for predicates that carry one.
    pub predicate_values: BTreeMap<String, FieldElement>,
    pub current_timestamp: u64,
}

/// Verifier service backed by a ledger replica.
pub struct Verifier {
    ledger: Arc<RevocationLedger>,
    policy: VerifierPolicy,
    trusted: Vec<FieldElement>,
}

impl Verifier {
    /// # Errors
    /// `InvalidKey` if a trusted issuer key does not parse.
    pub fn new(ledger: Arc<RevocationLedger>, policy: VerifierPolicy) -> Result<Self> {
        let trusted = policy
            .trusted_issuers
            .iter()
            .map(|k| canonical_public_key(k).map(|k| FieldElement::hash_text(&k)))
            .collect::<Result<_>>()?;
        Ok(Self { ledger, policy, trusted })
    }

    pub fn policy(&self) -> &VerifierPolicy {
        &self.policy
    }

    /// Runs every check that does not need the proving system.
    ///
    /// # Arguments
    /// * `proof` - The presentation received from a holder
    /// * `now` - Verification time, Unix seconds
    ///
    /// # Errors
    /// * Input errors (`MalformedPublicInputs`, `BitmapOutOfRange`, `UnknownField`, ...)
    ///   when the presentation is not well formed
    /// * `ProofRejected` when it is well formed but must not be accepted
    pub fn check_proof(&self, proof: &ZKProof, now: i64) -> Result<VerificationReport> {
        if proof.layout_version != LAYOUT_VERSION {
            return Err(CredentialError::MalformedPublicInputs(format!(
                "unsupported layout version {}",
                proof.layout_version
            )));
        }

        let schema = proof.credential_type.schema();
        let inputs = PublicInputs::parse(&proof.public_inputs, schema)?;

        let committed: BTreeSet<&str> = decode(inputs.bitmap, schema)?.into_iter().collect();
        for (name, value) in &proof.disclosed_fields {
            let spec = schema.field(name).ok_or_else(|| CredentialError::UnknownField {
                field: name.clone(),
                kind: schema.kind.to_string(),
            })?;
            if !committed.contains(name.as_str()) {
                return Err(CredentialError::ProofRejected(format!(
                    "`{name}` is disclosed but not selected by the bitmap"
                )));
            }
            to_field(&FieldValue::from_json(value, name)?, spec.ty, name)?;
        }
        if let Some(missing) = committed.iter().find(|f| !proof.disclosed_fields.contains_key(**f)) {
            return Err(CredentialError::ProofRejected(format!(
                "bitmap selects `{missing}` but no value was disclosed"
            )));
        }

        let issued_for = i64::try_from(inputs.current_timestamp).unwrap_or(i64::MAX);
        if issued_for > now.saturating_add(self.policy.max_clock_skew_secs) {
            return Err(CredentialError::ProofRejected("proof timestamp is in the future".into()));
        }
        if now.saturating_sub(issued_for) > self.policy.max_proof_age_secs {
            return Err(CredentialError::ProofRejected(format!(
                "proof is older than {} seconds",
                self.policy.max_proof_age_secs
            )));
        }

        if !self.trusted.is_empty() && !self.trusted.contains(&inputs.issuer_public_key) {
            warn!("Rejected {} proof from untrusted issuer", schema.kind);
            return Err(CredentialError::ProofRejected("issuer is not trusted".into()));
        }

        if self.ledger.is_revoked_field(&inputs.credential_id, &inputs.issuer_public_key) {
            info!("Rejected proof for revoked credential {}", inputs.credential_id);
            return Err(CredentialError::ProofRejected("credential has been revoked".into()));
        }

        let proven_predicates = inputs.predicates.active().map(|e| e.predicate).collect();
        let predicate_values = inputs
            .predicates
            .active()
            .filter_map(|e| e.aux.map(|aux| (e.predicate.to_string(), aux)))
            .collect();

        debug!("Proof for {} passed structural checks", schema.kind);
        Ok(VerificationReport {
            credential_type: schema.kind,
            credential_id: self.ledger.resolve_field(&inputs.credential_id),
            commitment: inputs.commitment,
            disclosed_fields: proof.disclosed_fields.clone(),
            proven_predicates,
            predicate_values,
            current_timestamp: inputs.current_timestamp,
        })
    }

    /// Runs [`Verifier::check_proof`] and then the external proof verifier.
    pub fn verify_proof(&self, proof: &ZKProof, now: i64, backend: &dyn ProofVerifier) -> Result<VerificationReport> {
        let report = self.check_proof(proof, now)?;
        if !backend.verify(proof.credential_type, &proof.proof_bytes, &proof.public_inputs)? {
            warn!("Proof bytes rejected for {} presentation", proof.credential_type);
            return Err(CredentialError::ProofRejected("proof does not verify".into()));
        }
        info!("Verified {} presentation", proof.credential_type);
        Ok(report)
    }
}
