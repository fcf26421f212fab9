// src/zkp/mod.rs
//! Field encoding, commitments and the proving-system contract.

pub mod commitment;
pub mod disclosure_codec;
pub mod field_codec;
pub mod poseidon;
pub mod predicates;
pub mod proof_contract;
pub mod public_inputs;

pub use field_codec::FieldElement;
pub use proof_contract::{CircuitInputs, ProofVerifier, ProvingBackend, ZKProof};
