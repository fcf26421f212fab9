// src/storage/mod.rs
//! Shared, replicated state.

pub mod revocation_ledger;

pub use revocation_ledger::{AppendOutcome, LedgerSnapshot, MergeReport, RevocationLedger};
