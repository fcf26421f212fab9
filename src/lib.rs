// src/lib.rs
//! # zk-credentials
//!
//! Selective-disclosure credentials over Poseidon commitments.
//!
//! ## Layers
//! 1. **Models**: credential kinds, schemas, disclosure scopes and revocation events
//! 2. **ZKP**: field encoding, commitments, predicate evaluation and the proving contract
//! 3. **Wallet**: holder keys, the encrypted credential store and presentation building
//! 4. **Storage**: the replicated revocation ledger
//! 5. **Services**: issuer, verifier and the HTTP API

pub mod error;
pub mod models;
pub mod services;
pub mod settings;
pub mod storage;
pub mod utils;
pub mod wallet;
pub mod zkp;

pub use error::{CredentialError, ErrorClass, Result};
pub use models::{Credential, CredentialAttributes, CredentialKind, DisclosureScope, PredicateId, SignedCredential};
pub use services::{ApiServer, CredentialIssuer, Verifier, VerifierPolicy};
pub use storage::RevocationLedger;
pub use wallet::{CredentialStorage, KeyManager};
pub use zkp::{FieldElement, ZKProof};
