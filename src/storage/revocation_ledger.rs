// src/storage/revocation_ledger.rs
//! Append-only revocation ledger.
//!
//! The ledger holds two grow-only sets:
//! - issuance records, each signed by the issuer it names
//! - revocation events, each signed by an issuer holding a record for the credential
//!
//! A credential as issued by a given key is revoked iff at least one accepted
//! event from that key names it. Because both sets only grow and nothing is
//! first-writer-wins, replicas converge by set union and "revoked" never flips
//! back. A "not revoked" answer only means no revocation is known to this
//! replica yet.
//!
//! Appends for one credential are serialized by a per-credential lock so the
//! issuer check and the append happen atomically. Locks exist only for ids
//! with an accepted issuance record. Appends for different credentials proceed
//! independently, and readers only contend with the short index update at the
//! end of an append.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{CredentialError, Result};
use crate::models::{IssuanceRecord, RevocationEvent};
use crate::wallet::key_management::{canonical_public_key, verify_signature};
use crate::zkp::FieldElement;

/// Result of a successful [`RevocationLedger::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AppendOutcome {
    /// First revocation for the credential.
    Recorded,
    /// A further, distinct event for a credential that was already revoked.
    AlreadyRevoked,
    /// The identical event is already in the log.
    Duplicate,
}

/// Replication payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub issuances: Vec<IssuanceRecord>,
    pub events: Vec<RevocationEvent>,
}

/// Counts from a [`RevocationLedger::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub accepted: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

/// An accepted event with its canonical issuer key.
#[derive(Clone)]
struct LoggedEvent {
    event: RevocationEvent,
    issuer: String,
}

#[derive(Default)]
struct LedgerState {
    /// Every accepted, signed issuance record.
    records: HashSet<IssuanceRecord>,
    /// Credential id to the canonical keys of issuers that signed a record for it.
    issuers: HashMap<String, BTreeSet<String>>,
    log: Vec<LoggedEvent>,
    event_ids: HashSet<String>,
    by_credential: HashMap<String, Vec<usize>>,
    by_field: HashMap<FieldElement, String>,
    /// `(credential id field, issuer key field)` pairs with at least one event.
    revoked_fields: HashSet<(FieldElement, FieldElement)>,
}

impl LedgerState {
    fn index_credential(&mut self, credential_id: &str) {
        self.by_field
            .entry(FieldElement::hash_text(credential_id))
            .or_insert_with(|| credential_id.to_string());
    }

    fn events_by<'a>(&'a self, credential_id: &str, issuer: &'a str) -> impl Iterator<Item = &'a RevocationEvent> + 'a {
        self.by_credential
            .get(credential_id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.log[i])
            .filter(move |logged| logged.issuer == issuer)
            .map(|logged| &logged.event)
    }
}

/// Shared handle to one ledger replica.
///
/// Authority is scoped per issuer: an event only revokes the credential as
/// issued by the key that signed it, and only if that key also signed an
/// issuance record for the credential id.
#[derive(Default)]
pub struct RevocationLedger {
    state: RwLock<LedgerState>,
    /// One entry per credential id with at least one accepted issuance record.
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RevocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn register_lock(&self, credential_id: &str) {
        let mut table = self.write_locks.lock().unwrap_or_else(PoisonError::into_inner);
        table.entry(credential_id.to_string()).or_default();
    }

    fn existing_lock(&self, credential_id: &str) -> Option<Arc<Mutex<()>>> {
        let table = self.write_locks.lock().unwrap_or_else(PoisonError::into_inner);
        table.get(credential_id).cloned()
    }

    /// Records which issuer may revoke a credential.
    ///
    /// Returns `true` if the record is new and `false` if it was already known.
    /// Several issuers may hold records for the same id; each can only revoke
    /// its own issuance.
    ///
    /// # Errors
    /// * `InvalidKey` if the issuer key does not parse
    /// * `UnsignedIssuance` if the record is not signed by the key it names
    pub fn record_issuance(&self, record: &IssuanceRecord) -> Result<bool> {
        let issuer = canonical_public_key(&record.issuer_public_key)?;
        if !verify_signature(&record.issuer_public_key, &record.message(), &record.issuer_signature).unwrap_or(false) {
            warn!("Rejected unsigned issuance record for {}", record.credential_id);
            return Err(CredentialError::UnsignedIssuance(record.credential_id.clone()));
        }

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if !state.records.insert(record.clone()) {
                return Ok(false);
            }
            state
                .issuers
                .entry(record.credential_id.clone())
                .or_default()
                .insert(issuer);
            state.index_credential(&record.credential_id);
        }
        self.register_lock(&record.credential_id);
        debug!("Recorded issuance of {}", record.credential_id);
        Ok(true)
    }

    /// Validates the issuer signature and appends a revocation event.
    ///
    /// # Errors
    /// `UnauthorizedRevocation` when the signing issuer holds no issuance
    /// record for the credential or the signature does not verify.
    pub fn append(&self, event: RevocationEvent) -> Result<AppendOutcome> {
        let unauthorized = || CredentialError::UnauthorizedRevocation(event.credential_id.clone());

        let Some(lock) = self.existing_lock(&event.credential_id) else {
            warn!("Revocation for unknown credential {}", event.credential_id);
            return Err(unauthorized());
        };
        let issuer = canonical_public_key(&event.issuer_public_key).map_err(|_| unauthorized())?;
        if !verify_signature(&event.issuer_public_key, &event.message(), &event.issuer_signature).unwrap_or(false) {
            warn!("Rejected revocation of {}: bad signature", event.credential_id);
            return Err(unauthorized());
        }

        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let event_id = event.event_id();
        {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            if state.event_ids.contains(&event_id) {
                debug!("Duplicate revocation event {event_id}");
                return Ok(AppendOutcome::Duplicate);
            }
            let recorded = state
                .issuers
                .get(&event.credential_id)
                .is_some_and(|issuers| issuers.contains(&issuer));
            if !recorded {
                warn!("Rejected revocation of {}: issuer holds no issuance record", event.credential_id);
                return Err(unauthorized());
            }
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let already_revoked = state.events_by(&event.credential_id, &issuer).next().is_some();
        let position = state.log.len();
        state
            .by_credential
            .entry(event.credential_id.clone())
            .or_default()
            .push(position);
        state.revoked_fields.insert((
            FieldElement::hash_text(&event.credential_id),
            FieldElement::hash_text(&issuer),
        ));
        state.event_ids.insert(event_id);
        info!("Revoked credential {} at {}", event.credential_id, event.revoked_at);
        state.log.push(LoggedEvent { event, issuer });

        Ok(if already_revoked {
            AppendOutcome::AlreadyRevoked
        } else {
            AppendOutcome::Recorded
        })
    }

    /// Whether `issuer_public_key` has revoked its issuance of `credential_id`.
    pub fn is_revoked(&self, credential_id: &str, issuer_public_key: &str) -> bool {
        let Ok(issuer) = canonical_public_key(issuer_public_key) else {
            return false;
        };
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let revoked = state.events_by(credential_id, &issuer).next().is_some();
        revoked
    }

    /// Revocation check by the credential-id and issuer-key field elements
    /// found in public inputs.
    pub fn is_revoked_field(&self, credential_id: &FieldElement, issuer_public_key: &FieldElement) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.revoked_fields.contains(&(*credential_id, *issuer_public_key))
    }

    /// The authoritative event for one issuance: earliest `revokedAt`, ties
    /// broken by event id, so converged replicas agree.
    pub fn get_revocation(&self, credential_id: &str, issuer_public_key: &str) -> Option<RevocationEvent> {
        let issuer = canonical_public_key(issuer_public_key).ok()?;
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let earliest = state
            .events_by(credential_id, &issuer)
            .min_by(|a, b| {
                a.revoked_at
                    .cmp(&b.revoked_at)
                    .then_with(|| a.event_id().cmp(&b.event_id()))
            })
            .cloned();
        earliest
    }

    /// All events naming a credential, from any issuer, in local append order.
    pub fn events_for(&self, credential_id: &str) -> Vec<RevocationEvent> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .by_credential
            .get(credential_id)
            .map(|idx| idx.iter().map(|&i| state.log[i].event.clone()).collect())
            .unwrap_or_default()
    }

    /// Canonical keys of every issuer holding a record for `credential_id`.
    pub fn issuers_of(&self, credential_id: &str) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .issuers
            .get(credential_id)
            .map(|issuers| issuers.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Resolves a credential-id field element to a known credential id.
    pub fn resolve_field(&self, credential_id: &FieldElement) -> Option<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.by_field.get(credential_id).cloned()
    }

    pub fn event_count(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).log.len()
    }

    /// Snapshot of both sets in a deterministic order.
    pub fn export(&self) -> LedgerSnapshot {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut issuances: Vec<IssuanceRecord> = state.records.iter().cloned().collect();
        issuances.sort_by_cached_key(|r| {
            (
                r.credential_id.clone(),
                r.issuer_public_key.clone(),
                r.commitment.to_string(),
                r.issuer_signature.clone(),
            )
        });

        let mut events: Vec<RevocationEvent> = state.log.iter().map(|logged| logged.event.clone()).collect();
        events.sort_by_cached_key(|e| (e.credential_id.clone(), e.revoked_at, e.event_id()));
        LedgerSnapshot { issuances, events }
    }

    /// Unions a snapshot from another replica into this one.
    ///
    /// Issuance records are merged first so that events in the same snapshot
    /// can be authorized. Records and events that fail validation are counted
    /// as rejected and skipped.
    pub fn merge(&self, snapshot: LedgerSnapshot) -> MergeReport {
        let mut report = MergeReport::default();

        for record in &snapshot.issuances {
            match self.record_issuance(record) {
                Ok(true) => report.accepted += 1,
                Ok(false) => report.duplicates += 1,
                Err(e) => {
                    warn!("Rejected issuance record during merge: {e}");
                    report.rejected += 1;
                }
            }
        }

        for event in snapshot.events {
            match self.append(event) {
                Ok(AppendOutcome::Duplicate) => report.duplicates += 1,
                Ok(_) => report.accepted += 1,
                Err(e) => {
                    warn!("Rejected revocation event during merge: {e}");
                    report.rejected += 1;
                }
            }
        }

        info!(
            "Merged ledger snapshot: {} accepted, {} duplicate, {} rejected",
            report.accepted, report.duplicates, report.rejected
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::key_management::KeyManager;
    use std::thread;

    fn signed_event(keys: &KeyManager, credential_id: &str, revoked_at: i64, reason: Option<&str>) -> RevocationEvent {
        RevocationEvent::signed(keys, credential_id, revoked_at, reason.map(str::to_string)).unwrap()
    }

    fn record(keys: &KeyManager, credential_id: &str) -> IssuanceRecord {
        IssuanceRecord::signed(keys, credential_id, FieldElement::hash_text(credential_id)).unwrap()
    }

    fn ledger_with(keys: &KeyManager, ids: &[&str]) -> RevocationLedger {
        let ledger = RevocationLedger::new();
        for id in ids {
            assert!(ledger.record_issuance(&record(keys, id)).unwrap());
        }
        ledger
    }

    #[test]
    fn test_append_and_query() {
        let issuer = KeyManager::generate();
        let key = issuer.public_key_hex();
        let ledger = ledger_with(&issuer, &["c1"]);
        assert!(!ledger.is_revoked("c1", &key));

        let event = signed_event(&issuer, "c1", 100, Some("lost"));
        assert_eq!(ledger.append(event.clone()).unwrap(), AppendOutcome::Recorded);
        assert!(ledger.is_revoked("c1", &key));
        assert!(ledger.is_revoked_field(&FieldElement::hash_text("c1"), &FieldElement::hash_text(&key)));
        assert_eq!(ledger.get_revocation("c1", &key), Some(event));
    }

    #[test]
    fn test_issuer_key_spelling_does_not_matter() {
        let issuer = KeyManager::generate();
        let key = issuer.public_key_hex();
        let ledger = ledger_with(&issuer, &["c1"]);
        ledger.append(signed_event(&issuer, "c1", 100, None)).unwrap();
        assert!(ledger.is_revoked("c1", &key.to_uppercase().replacen("0X", "", 1)));
    }

    #[test]
    fn test_duplicate_append_is_idempotent() {
        let issuer = KeyManager::generate();
        let ledger = ledger_with(&issuer, &["c1"]);
        let event = signed_event(&issuer, "c1", 100, None);
        ledger.append(event.clone()).unwrap();
        assert_eq!(ledger.append(event).unwrap(), AppendOutcome::Duplicate);
        assert_eq!(ledger.event_count(), 1);
    }

    #[test]
    fn test_earliest_event_wins() {
        let issuer = KeyManager::generate();
        let key = issuer.public_key_hex();
        let ledger = ledger_with(&issuer, &["c1"]);
        let late = signed_event(&issuer, "c1", 200, Some("second"));
        let early = signed_event(&issuer, "c1", 100, Some("first"));
        assert_eq!(ledger.append(late).unwrap(), AppendOutcome::Recorded);
        assert_eq!(ledger.append(early.clone()).unwrap(), AppendOutcome::AlreadyRevoked);
        assert_eq!(ledger.get_revocation("c1", &key), Some(early));
        assert_eq!(ledger.events_for("c1").len(), 2);
    }

    #[test]
    fn test_unauthorized_revocation_is_rejected() {
        let issuer = KeyManager::generate();
        let mallory = KeyManager::generate();
        let ledger = ledger_with(&issuer, &["c1"]);

        let forged = signed_event(&mallory, "c1", 100, None);
        assert!(matches!(
            ledger.append(forged),
            Err(CredentialError::UnauthorizedRevocation(_))
        ));
        assert!(!ledger.is_revoked("c1", &issuer.public_key_hex()));
        assert!(!ledger.is_revoked("c1", &mallory.public_key_hex()));

        let unknown = signed_event(&issuer, "never-issued", 100, None);
        assert!(matches!(
            ledger.append(unknown),
            Err(CredentialError::UnauthorizedRevocation(_))
        ));
        assert!(!ledger.is_revoked("never-issued", &issuer.public_key_hex()));
    }

    #[test]
    fn test_event_claiming_another_issuer_is_rejected() {
        let issuer = KeyManager::generate();
        let mallory = KeyManager::generate();
        let ledger = ledger_with(&issuer, &["c1"]);
        let mut forged = signed_event(&mallory, "c1", 100, None);
        forged.issuer_public_key = issuer.public_key_hex();
        assert!(ledger.append(forged).is_err());
        assert_eq!(ledger.event_count(), 0);
    }

    #[test]
    fn test_tampered_event_is_rejected() {
        let issuer = KeyManager::generate();
        let ledger = ledger_with(&issuer, &["c1"]);
        let mut event = signed_event(&issuer, "c1", 100, Some("lost"));
        event.reason = Some("fraud".into());
        assert!(ledger.append(event).is_err());

        let mut emptied = signed_event(&issuer, "c1", 100, None);
        emptied.reason = Some(String::new());
        assert!(ledger.append(emptied).is_err());
        assert!(!ledger.is_revoked("c1", &issuer.public_key_hex()));
    }

    #[test]
    fn test_unsigned_issuance_record_is_rejected() {
        let issuer = KeyManager::generate();
        let mallory = KeyManager::generate();
        let ledger = RevocationLedger::new();

        let mut claimed = record(&mallory, "c1");
        claimed.issuer_public_key = issuer.public_key_hex();
        assert!(matches!(
            ledger.record_issuance(&claimed),
            Err(CredentialError::UnsignedIssuance(_))
        ));

        let mut retargeted = record(&issuer, "c1");
        retargeted.credential_id = "c2".into();
        assert!(ledger.record_issuance(&retargeted).is_err());
        assert!(ledger.issuers_of("c1").is_empty());
        assert!(ledger.export().issuances.is_empty());
    }

    #[test]
    fn test_squatted_id_cannot_block_real_issuer() {
        let issuer = KeyManager::generate();
        let mallory = KeyManager::generate();
        let key = issuer.public_key_hex();

        let a = ledger_with(&issuer, &["cred-x"]);
        a.append(signed_event(&issuer, "cred-x", 100, None)).unwrap();

        let b = RevocationLedger::new();
        let squat = LedgerSnapshot {
            issuances: vec![record(&mallory, "cred-x")],
            events: vec![signed_event(&mallory, "cred-x", 5, None)],
        };
        assert_eq!(b.merge(squat).rejected, 0);
        assert!(!b.is_revoked("cred-x", &key));

        let report = b.merge(a.export());
        assert_eq!(report.rejected, 0);
        assert!(b.is_revoked("cred-x", &key));
        assert_eq!(b.get_revocation("cred-x", &key).map(|e| e.revoked_at), Some(100));

        a.merge(b.export());
        assert_eq!(a.export(), b.export());
        assert_eq!(a.get_revocation("cred-x", &key).map(|e| e.revoked_at), Some(100));
        assert_eq!(
            a.get_revocation("cred-x", &mallory.public_key_hex()).map(|e| e.revoked_at),
            Some(5)
        );
    }

    #[test]
    fn test_rejected_appends_do_not_grow_lock_table() {
        let issuer = KeyManager::generate();
        let ledger = ledger_with(&issuer, &["c1"]);
        for i in 0..200 {
            let event = signed_event(&issuer, &format!("unknown-{i}"), 1, None);
            assert!(ledger.append(event).is_err());
        }
        let table = ledger.write_locks.lock().unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains_key("c1"));
    }

    #[test]
    fn test_replicas_converge_by_union() {
        let issuer = KeyManager::generate();
        let key = issuer.public_key_hex();
        let a = ledger_with(&issuer, &["c1", "c2"]);
        let b = ledger_with(&issuer, &["c1", "c2"]);
        a.append(signed_event(&issuer, "c1", 100, None)).unwrap();
        b.append(signed_event(&issuer, "c2", 150, None)).unwrap();
        b.append(signed_event(&issuer, "c1", 120, Some("dup"))).unwrap();

        let report = a.merge(b.export());
        assert_eq!(report.rejected, 0);
        b.merge(a.export());

        assert_eq!(a.export(), b.export());
        assert_eq!(a.get_revocation("c1", &key), b.get_revocation("c1", &key));
        assert!(a.is_revoked("c2", &key) && b.is_revoked("c1", &key));
    }

    #[test]
    fn test_merge_rejects_forged_events() {
        let issuer = KeyManager::generate();
        let mallory = KeyManager::generate();
        let local = ledger_with(&issuer, &["c1"]);
        let mut forged_record = record(&mallory, "c1");
        forged_record.issuer_public_key = issuer.public_key_hex();
        let snapshot = LedgerSnapshot {
            issuances: vec![forged_record],
            events: vec![signed_event(&mallory, "c1", 10, None)],
        };
        let report = local.merge(snapshot);
        assert_eq!(report.rejected, 2);
        assert_eq!(local.event_count(), 0);
    }

    #[test]
    fn test_revocation_is_monotonic_under_concurrency() {
        let issuer = KeyManager::generate();
        let key = issuer.public_key_hex();
        let ids: Vec<String> = (0..8).map(|i| format!("c{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let ledger = Arc::new(ledger_with(&issuer, &id_refs));

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let ledger = Arc::clone(&ledger);
                let event = signed_event(&issuer, &id, 1, None);
                let key = key.clone();
                thread::spawn(move || {
                    for _ in 0..3 {
                        ledger.append(event.clone()).unwrap();
                        assert!(ledger.is_revoked(&id, &key));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.event_count(), ids.len());
        assert!(ids.iter().all(|id| ledger.is_revoked(id, &key)));
    }
}
