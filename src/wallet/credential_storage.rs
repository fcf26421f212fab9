// src/wallet/credential_storage.rs
//! Encrypted credential storage for the wallet component.
//!
//! Each signed credential is serialized, encrypted under a key derived from
//! its holder's public key, and stored next to a plaintext index. Lookups by
//! holder or issuer read only the index and never decrypt.
//!
//! Deleting a record is local cleanup. It does NOT revoke the credential;
//! revocation is recorded in the [`crate::storage::RevocationLedger`].

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::encryption::{derive_holder_key, open, seal};
use crate::error::{CredentialError, Result};
use crate::models::{CredentialKind, SignedCredential};
use crate::utils::serialization::base64_bytes;
use crate::zkp::commitment::commit;
use crate::zkp::FieldElement;

/// Plaintext metadata kept beside each encrypted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialIndex {
    pub credential_id: String,
    pub credential_type: CredentialKind,
    pub holder_public_key: String,
    pub issuer_public_key: String,
    pub commitment: FieldElement,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// One encrypted record as handed to the persistence transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    pub index: CredentialIndex,
    /// `iv || ciphertext || tag`, base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
}

/// In-memory encrypted credential store.
///
/// # Concurrency
/// - Records live behind one `RwLock`; encryption happens before the lock is taken
/// - Concurrent `put`s for the same id are last-writer-wins
pub struct CredentialStorage {
    records: RwLock<HashMap<String, StoredCredential>>,
    kdf_salt: Vec<u8>,
}

impl CredentialStorage {
    /// Creates an empty store whose keys are salted with `kdf_salt`.
    pub fn new(kdf_salt: impl Into<Vec<u8>>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            kdf_salt: kdf_salt.into(),
        }
    }

    /// Encrypts and stores a signed credential, replacing any previous record
    /// with the same id.
    ///
    /// # Errors
    /// `MalformedCredential` if `signed.commitment` is not the commitment to
    /// `signed.credential`.
    pub fn put(&self, signed: &SignedCredential) -> Result<CredentialIndex> {
        let credential = &signed.credential;
        if commit(credential)? != signed.commitment {
            return Err(CredentialError::MalformedCredential(format!(
                "commitment does not match credential `{}`",
                credential.credential_id
            )));
        }
        let index = CredentialIndex {
            credential_id: credential.credential_id.clone(),
            credential_type: credential.kind(),
            holder_public_key: credential.holder_public_key().to_string(),
            issuer_public_key: signed.issuer_public_key.clone(),
            commitment: signed.commitment,
            issued_at: credential.issued_at(),
            expires_at: credential.expires_at(),
        };

        let key = derive_holder_key(&index.holder_public_key, &self.kdf_salt)?;
        let plaintext = serde_json::to_vec(signed)?;
        let ciphertext = seal(&key, &plaintext, index.credential_id.as_bytes())?;

        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(
            index.credential_id.clone(),
            StoredCredential {
                index: index.clone(),
                ciphertext,
            },
        );
        debug!("Stored credential {} for holder {}", index.credential_id, index.holder_public_key);
        Ok(index)
    }

    /// Decrypts a credential with the key derived from `holder_public_key`.
    ///
    /// # Returns
    /// - `Ok(None)` if no record exists
    /// - `Err(Decryption)` if the key does not match the record
    pub fn get(&self, credential_id: &str, holder_public_key: &str) -> Result<Option<SignedCredential>> {
        let ciphertext = {
            let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
            match records.get(credential_id) {
                Some(record) => record.ciphertext.clone(),
                None => return Ok(None),
            }
        };

        let key = derive_holder_key(holder_public_key, &self.kdf_salt)?;
        let plaintext = open(&key, &ciphertext, credential_id.as_bytes())?;
        let signed: SignedCredential = serde_json::from_slice(&plaintext)
            .map_err(|_| CredentialError::Decryption(credential_id.to_string()))?;
        Ok(Some(signed))
    }

    pub fn index(&self, credential_id: &str) -> Option<CredentialIndex> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(credential_id).map(|r| r.index.clone())
    }

    fn scan(&self, pred: impl Fn(&CredentialIndex) -> bool) -> Vec<CredentialIndex> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<CredentialIndex> = records
            .values()
            .map(|r| &r.index)
            .filter(|i| pred(i))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.issued_at.cmp(&b.issued_at).then_with(|| a.credential_id.cmp(&b.credential_id)));
        out
    }

    /// Index entries for a holder, without decrypting anything.
    pub fn by_holder(&self, holder_public_key: &str) -> Vec<CredentialIndex> {
        self.scan(|i| i.holder_public_key.eq_ignore_ascii_case(holder_public_key))
    }

    /// Index entries for an issuer, without decrypting anything.
    pub fn by_issuer(&self, issuer_public_key: &str) -> Vec<CredentialIndex> {
        self.scan(|i| i.issuer_public_key.eq_ignore_ascii_case(issuer_public_key))
    }

    /// Removes a record locally. This is not a revocation.
    ///
    /// Returns `true` if a record was removed.
    pub fn delete(&self, credential_id: &str) -> bool {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let removed = records.remove(credential_id).is_some();
        if removed {
            info!("Deleted local copy of credential {credential_id}");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encrypted records for the persistence transport, ordered by id.
    pub fn export(&self) -> Vec<StoredCredential> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<StoredCredential> = records.values().cloned().collect();
        out.sort_by(|a, b| a.index.credential_id.cmp(&b.index.credential_id));
        out
    }

    /// Loads encrypted records, replacing local records with the same id.
    ///
    /// Returns the number of records loaded.
    pub fn import(&self, snapshot: Vec<StoredCredential>) -> usize {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let count = snapshot.len();
        for record in snapshot {
            records.insert(record.index.credential_id.clone(), record);
        }
        debug!("Imported {count} encrypted credential records");
        count
    }
}
