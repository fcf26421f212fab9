// src/models/mod.rs
//! Data models shared by issuer, holder and verifier.

pub mod credential;
pub mod disclosure;
pub mod revocation;
pub mod schema;

pub use credential::{Credential, CredentialAttributes, SignedCredential};
pub use disclosure::DisclosureScope;
pub use revocation::{IssuanceRecord, RevocationEvent};
pub use schema::{CredentialKind, PredicateId, Schema};
