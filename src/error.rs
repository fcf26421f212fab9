// src/error.rs
//! Error taxonomy for the credential engine.
//!
//! Every failure in this crate is a local, recoverable error returned to the
//! caller. Errors are grouped by [`ErrorClass`] so callers can tell "the input
//! was invalid" apart from "the system could not verify", which carry very
//! different trust implications for a selective-disclosure system.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Coarse classification of a [`CredentialError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller supplied something the schema or codec rejects.
    InvalidInput,
    /// The input was well formed but a cryptographic or ledger check failed.
    VerificationFailed,
    /// Something went wrong inside the engine or an external collaborator.
    Internal,
}

/// All errors produced by the credential engine.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// A required credential field is missing or invalid.
    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    /// A disclosure scope names a field the schema does not declare.
    #[error("unknown field `{field}` for credential type `{kind}`")]
    UnknownField { field: String, kind: String },

    /// The credential kind is not one of the supported kinds.
    #[error("unknown credential type `{0}`")]
    UnknownCredentialType(String),

    /// A predicate is not declared for the credential kind.
    #[error("predicate `{predicate}` is not supported for credential type `{kind}`")]
    PredicateNotSupported { predicate: String, kind: String },

    /// A predicate that compares against a public value was requested without one.
    #[error("predicate `{0}` requires an auxiliary value")]
    MissingPredicateValue(String),

    /// A value cannot be represented as a field element.
    #[error("value `{value}` for `{context}` is outside the proving field range")]
    OutOfRange { value: String, context: String },

    /// A bitmap has bits set beyond the schema width.
    #[error("bitmap {bitmap:#x} sets bits beyond the {width}-field schema")]
    BitmapOutOfRange { bitmap: u64, width: usize },

    /// Public inputs do not match the kind's canonical layout.
    #[error("malformed public inputs: {0}")]
    MalformedPublicInputs(String),

    /// The holder asked to prove a predicate that does not hold.
    #[error("predicate `{0}` does not hold for this credential")]
    PredicateUnsatisfied(String),

    /// A revocation signature does not match the recorded issuer.
    #[error("unauthorized revocation for credential `{0}`")]
    UnauthorizedRevocation(String),

    /// An issuance record is not signed by the issuer it names.
    #[error("issuance record for credential `{0}` is not signed by its issuer")]
    UnsignedIssuance(String),

    /// Wrong key or corrupted ciphertext.
    #[error("failed to decrypt credential `{0}`")]
    Decryption(String),

    /// The AEAD seal operation failed.
    #[error("failed to encrypt credential `{0}`")]
    Encryption(String),

    /// A public key or signature could not be parsed.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// A presented proof failed a verification check.
    #[error("proof rejected: {0}")]
    ProofRejected(String),

    /// No record exists for the given credential id.
    #[error("credential `{0}` not found")]
    NotFound(String),

    /// The external proving or verification backend failed.
    #[error("backend failure: {0}")]
    Backend(String),

    /// A request body or query string could not be parsed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// JSON encoding or decoding failed.
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CredentialError {
    /// Classifies this error for callers and transport layers.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedCredential(_)
            | Self::UnknownField { .. }
            | Self::UnknownCredentialType(_)
            | Self::PredicateNotSupported { .. }
            | Self::MissingPredicateValue(_)
            | Self::OutOfRange { .. }
            | Self::BitmapOutOfRange { .. }
            | Self::MalformedPublicInputs(_)
            | Self::PredicateUnsatisfied(_)
            | Self::InvalidKey(_)
            | Self::NotFound(_)
            | Self::InvalidRequest(_)
            | Self::Serialization(_) => ErrorClass::InvalidInput,
            Self::UnauthorizedRevocation(_)
            | Self::UnsignedIssuance(_)
            | Self::Decryption(_)
            | Self::ProofRejected(_) => ErrorClass::VerificationFailed,
            Self::Encryption(_) | Self::Backend(_) => ErrorClass::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let unknown = CredentialError::UnknownField {
            field: "shoeSize".into(),
            kind: "college-id".into(),
        };
        assert_eq!(unknown.class(), ErrorClass::InvalidInput);
        assert_eq!(
            CredentialError::UnauthorizedRevocation("c1".into()).class(),
            ErrorClass::VerificationFailed
        );
        assert_eq!(
            CredentialError::Backend("timeout".into()).class(),
            ErrorClass::Internal
        );
    }

    #[test]
    fn test_error_messages_carry_detail() {
        let err = CredentialError::BitmapOutOfRange { bitmap: 0x10000, width: 12 };
        assert_eq!(err.to_string(), "bitmap 0x10000 sets bits beyond the 12-field schema");
    }
}
