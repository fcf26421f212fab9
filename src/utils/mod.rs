// src/utils/mod.rs
//! Helper functions shared by every layer.

pub mod crypto;
pub mod serialization;
