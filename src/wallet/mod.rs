// src/wallet/mod.rs
//! Holder wallet: keys, encrypted storage and presentation building.

pub mod credential_storage;
pub mod encryption;
pub mod key_management;
pub mod zkp_generation;

pub use credential_storage::{CredentialIndex, CredentialStorage, StoredCredential};
pub use key_management::KeyManager;
