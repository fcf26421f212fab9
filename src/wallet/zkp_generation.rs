// src/wallet/zkp_generation.rs
//! Holder-side presentation building.
//!
//! A presentation proves the chosen predicates and reveals the chosen fields
//! of one stored credential. Preparation runs every requested predicate
//! natively first, so a request that cannot hold fails locally with
//! `PredicateUnsatisfied` instead of inside the prover.

use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::credential_storage::CredentialStorage;
use crate::error::{CredentialError, Result};
use crate::models::{DisclosureScope, SignedCredential};
use crate::zkp::disclosure_codec::encode;
use crate::zkp::predicates::evaluate;
use crate::zkp::proof_contract::{build_circuit_inputs, CircuitInputs, ProvingBackend, ZKProof};

/// Inputs for one proof plus the values the holder will reveal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub circuit_inputs: CircuitInputs,
    pub disclosed_fields: BTreeMap<String, Value>,
}

/// Builds a presentation from a credential already in hand.
///
/// # Arguments
/// * `signed` - The issued credential
/// * `scope` - Fields to reveal and predicates to prove
/// * `now` - Presentation time, Unix seconds
///
/// # Errors
/// * Any scope encoding error (`UnknownField`, `PredicateNotSupported`, ...)
/// * `PredicateUnsatisfied` if a requested predicate is false for this credential
pub fn prepare_from_credential(signed: &SignedCredential, scope: &DisclosureScope, now: i64) -> Result<Presentation> {
    let credential = &signed.credential;
    let encoded = encode(scope, credential.schema())?;

    for entry in encoded.predicates.active() {
        if !evaluate(entry.predicate, credential, entry.aux.as_ref(), now)? {
            debug!("Predicate {} does not hold for {}", entry.predicate, credential.credential_id);
            return Err(CredentialError::PredicateUnsatisfied(entry.predicate.to_string()));
        }
    }

    let circuit_inputs = build_circuit_inputs(credential, scope, &signed.issuer_public_key, now)?;

    let mut disclosed_fields = BTreeMap::new();
    for field in &scope.fields {
        disclosed_fields.insert(field.clone(), credential.field_value(field)?);
    }

    Ok(Presentation {
        circuit_inputs,
        disclosed_fields,
    })
}

/// Loads a credential from the holder's store and builds a presentation.
///
/// # Errors
/// * `NotFound` if the store has no such credential
/// * `Decryption` if `holder_public_key` does not open the record
pub fn prepare_presentation(
    store: &CredentialStorage,
    credential_id: &str,
    holder_public_key: &str,
    scope: &DisclosureScope,
    now: i64,
) -> Result<Presentation> {
    let signed = store
        .get(credential_id, holder_public_key)?
        .ok_or_else(|| CredentialError::NotFound(credential_id.to_string()))?;
    prepare_from_credential(&signed, scope, now)
}

/// Runs the external prover and assembles the proof sent to a verifier.
///
/// # Errors
/// `Backend` if the prover fails or returns public inputs that differ from
/// the ones it was given.
pub fn generate_credential_proof(
    presentation: &Presentation,
    backend: &dyn ProvingBackend,
    verifier_contract_address: &str,
) -> Result<ZKProof> {
    let inputs = &presentation.circuit_inputs;
    let output = backend.prove(inputs)?;
    if output.public_inputs != inputs.public_inputs {
        return Err(CredentialError::Backend(
            "prover returned public inputs that differ from the request".into(),
        ));
    }

    info!(
        "Generated {} proof disclosing {} field(s)",
        inputs.credential_type,
        presentation.disclosed_fields.len()
    );
    Ok(ZKProof {
        proof_bytes: output.proof_bytes,
        public_inputs: output.public_inputs,
        credential_type: inputs.credential_type,
        disclosed_fields: presentation.disclosed_fields.clone(),
        verifier_contract_address: verifier_contract_address.to_string(),
        layout_version: inputs.layout_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::fixtures::*;
    use crate::zkp::commitment::commit;
    use crate::zkp::proof_contract::{DigestBackend, ProofOutput};
    use crate::zkp::FieldElement;

    fn signed(credential: crate::models::Credential) -> SignedCredential {
        SignedCredential {
            commitment: commit(&credential).unwrap(),
            credential,
            issuer_public_key: issuer_key(),
            signature: "0x00".into(),
        }
    }

    struct LyingBackend;

    impl ProvingBackend for LyingBackend {
        fn prove(&self, inputs: &CircuitInputs) -> Result<ProofOutput> {
            let mut public_inputs = inputs.public_inputs.clone();
            public_inputs[2] = FieldElement::from_u64(0xfff);
            Ok(ProofOutput {
                proof_bytes: vec![1],
                public_inputs,
            })
        }
    }

    #[test]
    fn test_presentation_discloses_only_requested_fields() {
        let scope = DisclosureScope::new(["institutionName"], ["age_over_18", "status_active"]);
        let presentation = prepare_from_credential(&signed(college_credential()), &scope, NOW).unwrap();
        assert_eq!(presentation.disclosed_fields.len(), 1);
        assert_eq!(presentation.disclosed_fields["institutionName"], "MIT");
    }

    #[test]
    fn test_unsatisfied_predicate_is_refused() {
        let scope = DisclosureScope::new(Vec::<String>::new(), ["age_over_21"]);
        let err = prepare_from_credential(&signed(citizenship_credential()), &scope, NOW).unwrap_err();
        assert!(matches!(err, CredentialError::PredicateUnsatisfied(_)));
    }

    #[test]
    fn test_prepare_from_store() {
        let store = CredentialStorage::new(b"salt".to_vec());
        store.put(&signed(license_credential())).unwrap();
        let scope = DisclosureScope::new(["vehicleClass"], ["class_match"]).with_value("class_match", "B");

        let presentation = prepare_presentation(&store, "cred-3", "0x03driver", &scope, NOW).unwrap();
        assert_eq!(presentation.disclosed_fields["vehicleClass"], "B");

        assert!(matches!(
            prepare_presentation(&store, "cred-3", "0x02wrong", &scope, NOW),
            Err(CredentialError::Decryption(_))
        ));
        assert!(matches!(
            prepare_presentation(&store, "missing", "0x03driver", &scope, NOW),
            Err(CredentialError::NotFound(_))
        ));
    }

    #[test]
    fn test_generate_proof() {
        let scope = DisclosureScope::new(["program"], ["year_valid"]);
        let presentation = prepare_from_credential(&signed(college_credential()), &scope, NOW).unwrap();
        let proof = generate_credential_proof(&presentation, &DigestBackend, "0xverifier").unwrap();
        assert_eq!(proof.public_inputs, presentation.circuit_inputs.public_inputs);
        assert_eq!(proof.verifier_contract_address, "0xverifier");
        assert_eq!(proof.disclosed_fields["program"], "Computer Science");
    }

    #[test]
    fn test_backend_must_echo_public_inputs() {
        let presentation = prepare_from_credential(&signed(college_credential()), &DisclosureScope::default(), NOW).unwrap();
        assert!(matches!(
            generate_credential_proof(&presentation, &LyingBackend, "0x0"),
            Err(CredentialError::Backend(_))
        ));
    }
}
