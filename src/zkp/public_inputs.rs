// src/zkp/public_inputs.rs
//! Canonical public-input layout shared by prover and verifier.
//!
//! Layout version 1:
//!
//! ```text
//! [credentialId, commitment, bitmap, issuerPublicKey, holderPublicKey,
//!  predicate slots..., currentTimestamp]
//! ```
//!
//! The predicate slots follow the schema's predicate declaration order. Any
//! change to this ordering needs a new layout version.

use super::disclosure_codec::{decode, decode_predicates, PredicateVector};
use super::field_codec::FieldElement;
use crate::error::{CredentialError, Result};
use crate::models::Schema;

pub const LAYOUT_VERSION: u32 = 1;

/// Number of fixed slots before the predicate block.
const HEADER_SLOTS: usize = 5;

/// Typed view over a public-input vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicInputs {
    pub credential_id: FieldElement,
    pub commitment: FieldElement,
    pub bitmap: u64,
    pub issuer_public_key: FieldElement,
    pub holder_public_key: FieldElement,
    pub predicates: PredicateVector,
    pub current_timestamp: u64,
}

impl PublicInputs {
    /// Expected vector length for a kind.
    pub fn expected_len(schema: &Schema) -> usize {
        HEADER_SLOTS + schema.predicate_slots() + 1
    }

    /// Flattens into the canonical order.
    pub fn to_vec(&self) -> Vec<FieldElement> {
        let mut out = vec![
            self.credential_id,
            self.commitment,
            FieldElement::from_u64(self.bitmap),
            self.issuer_public_key,
            self.holder_public_key,
        ];
        out.extend(self.predicates.slots());
        out.push(FieldElement::from_u64(self.current_timestamp));
        out
    }

    /// Parses a public-input vector for the given kind.
    ///
    /// # Errors
    /// * `MalformedPublicInputs` on a length mismatch or non-integral slot
    /// * `BitmapOutOfRange` if the bitmap sets bits beyond the schema width
    pub fn parse(values: &[FieldElement], schema: &Schema) -> Result<Self> {
        let expected = Self::expected_len(schema);
        if values.len() != expected {
            return Err(CredentialError::MalformedPublicInputs(format!(
                "{} expects {expected} public inputs, got {}",
                schema.kind,
                values.len()
            )));
        }

        let bitmap = values[2]
            .to_u64()
            .ok_or_else(|| CredentialError::MalformedPublicInputs("bitmap exceeds 64 bits".into()))?;
        decode(bitmap, schema)?;

        let predicate_end = expected - 1;
        let predicates = decode_predicates(&values[HEADER_SLOTS..predicate_end], schema)?;
        let current_timestamp = values[predicate_end]
            .to_u64()
            .ok_or_else(|| CredentialError::MalformedPublicInputs("timestamp exceeds 64 bits".into()))?;

        Ok(Self {
            credential_id: values[0],
            commitment: values[1],
            bitmap,
            issuer_public_key: values[3],
            holder_public_key: values[4],
            predicates,
            current_timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::{CITIZENSHIP_CARD, COLLEGE_ID};
    use crate::models::DisclosureScope;
    use crate::zkp::disclosure_codec::encode;

    fn sample(schema: &Schema, scope: &DisclosureScope) -> PublicInputs {
        let encoded = encode(scope, schema).unwrap();
        PublicInputs {
            credential_id: FieldElement::hash_text("cred-1"),
            commitment: FieldElement::from_u64(77),
            bitmap: encoded.bitmap,
            issuer_public_key: FieldElement::hash_text("issuer"),
            holder_public_key: FieldElement::hash_text("holder"),
            predicates: encoded.predicates,
            current_timestamp: 1_760_000_000,
        }
    }

    #[test]
    fn test_college_layout() {
        let scope = DisclosureScope::new(["institutionName"], ["age_over_18", "status_active"]);
        let inputs = sample(&COLLEGE_ID, &scope);
        let flat = inputs.to_vec();
        assert_eq!(flat.len(), 9);
        assert_eq!(flat[1], FieldElement::from_u64(77));
        assert_eq!(flat[2], FieldElement::from_u64(2));
        assert_eq!(&flat[5..8], &[FieldElement::from_u64(1), FieldElement::zero(), FieldElement::from_u64(1)]);
        assert_eq!(flat[8], FieldElement::from_u64(1_760_000_000));
        assert_eq!(PublicInputs::parse(&flat, &COLLEGE_ID).unwrap(), inputs);
    }

    #[test]
    fn test_aux_layout() {
        let scope = DisclosureScope::new(Vec::<String>::new(), ["nationality_match"]).with_value("nationality_match", "Nepal");
        let inputs = sample(&CITIZENSHIP_CARD, &scope);
        let flat = inputs.to_vec();
        assert_eq!(flat.len(), PublicInputs::expected_len(&CITIZENSHIP_CARD));
        assert_eq!(flat[8], FieldElement::hash_text("Nepal"));
        assert_eq!(PublicInputs::parse(&flat, &CITIZENSHIP_CARD).unwrap(), inputs);
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let scope = DisclosureScope::default();
        let mut flat = sample(&COLLEGE_ID, &scope).to_vec();
        flat.push(FieldElement::zero());
        assert!(matches!(
            PublicInputs::parse(&flat, &COLLEGE_ID),
            Err(CredentialError::MalformedPublicInputs(_))
        ));
    }

    #[test]
    fn test_bitmap_overflow_is_rejected() {
        let mut flat = sample(&COLLEGE_ID, &DisclosureScope::default()).to_vec();
        flat[2] = FieldElement::from_u64(1 << 20);
        assert!(matches!(
            PublicInputs::parse(&flat, &COLLEGE_ID),
            Err(CredentialError::BitmapOutOfRange { .. })
        ));
        flat[2] = FieldElement::hash_text("huge");
        assert!(PublicInputs::parse(&flat, &COLLEGE_ID).is_err());
    }
}
