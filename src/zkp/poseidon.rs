// src/zkp/poseidon.rs
//! Poseidon hashing over BN254.
//!
//! The commitment is computed with the same sponge a proving circuit would
//! use, so opening a commitment inside a proof stays cheap.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge};
use ark_crypto_primitives::sponge::CryptographicSponge;
use ark_ff::PrimeField;
use once_cell::sync::Lazy;

use super::field_codec::FieldElement;

const FULL_ROUNDS: usize = 8;
const PARTIAL_ROUNDS: usize = 57;
const ALPHA: u64 = 5;
const RATE: usize = 2;
const CAPACITY: usize = 1;

/// Cached Poseidon configuration for the BN254 scalar field.
///
/// ## Parameters
/// - Full rounds: 8
/// - Partial rounds: 57
/// - Alpha (S-box): 5
/// - Rate: 2
/// - Capacity: 1
///
/// Round constants and the MDS matrix come from the Grain LFSR, so every
/// process derives identical parameters.
static POSEIDON_CONFIG: Lazy<PoseidonConfig<Fr>> = Lazy::new(generate_poseidon_config);

/// Derives the Poseidon parameters.
pub fn generate_poseidon_config() -> PoseidonConfig<Fr> {
    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        Fr::MODULUS_BIT_SIZE as u64,
        RATE,
        FULL_ROUNDS as u64,
        PARTIAL_ROUNDS as u64,
        0,
    );

    PoseidonConfig {
        full_rounds: FULL_ROUNDS,
        partial_rounds: PARTIAL_ROUNDS,
        alpha: ALPHA,
        mds,
        ark,
        rate: RATE,
        capacity: CAPACITY,
    }
}

/// Retrieves the global Poseidon configuration.
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    &POSEIDON_CONFIG
}

/// Absorbs `inputs` in order and squeezes a single field element.
pub fn poseidon_hash(inputs: &[FieldElement]) -> FieldElement {
    let mut sponge = PoseidonSponge::<Fr>::new(poseidon_config());
    for input in inputs {
        sponge.absorb(&input.0);
    }
    let squeezed = sponge.squeeze_field_elements::<Fr>(1);
    FieldElement(squeezed[0])
}
