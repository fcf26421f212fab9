// src/services/mod.rs
//! Issuer, verifier and HTTP services.

pub mod api_server;
pub mod credential_issuer;
pub mod verifier;

pub use api_server::ApiServer;
pub use credential_issuer::CredentialIssuer;
pub use verifier::{VerificationReport, Verifier, VerifierPolicy};
