// src/zkp/disclosure_codec.rs
//! Encoding of disclosure scopes into bitmaps and predicate vectors.
//!
//! Bit `i` of a bitmap is set iff the schema field at index `i` is disclosed.
//! The predicate vector has one entry per predicate the schema declares, in
//! declaration order. Predicates that compare against a public value also
//! carry that value's field encoding.

use std::collections::BTreeSet;

use log::debug;

use super::field_codec::{to_field, FieldElement, FieldValue};
use crate::error::{CredentialError, Result};
use crate::models::{DisclosureScope, PredicateId, Schema};

/// Activation state of one declared predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateEntry {
    pub predicate: PredicateId,
    pub active: bool,
    /// Public auxiliary value; `None` for predicates without one or when inactive.
    pub aux: Option<FieldElement>,
}

/// Per-kind predicate activation vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateVector {
    pub entries: Vec<PredicateEntry>,
}

impl PredicateVector {
    /// Flags in declaration order (1 = prove, 0 = skip).
    pub fn flags(&self) -> Vec<u8> {
        self.entries.iter().map(|e| u8::from(e.active)).collect()
    }

    pub fn active(&self) -> impl Iterator<Item = &PredicateEntry> {
        self.entries.iter().filter(|e| e.active)
    }

    /// Public-input slots: each flag, followed by the auxiliary slot for
    /// predicates that take one (zero when inactive).
    pub fn slots(&self) -> Vec<FieldElement> {
        let mut slots = Vec::new();
        for entry in &self.entries {
            slots.push(FieldElement::from_bool(entry.active));
            if entry.predicate.takes_aux() {
                slots.push(entry.aux.unwrap_or_else(FieldElement::zero));
            }
        }
        slots
    }
}

/// Output of [`encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedScope {
    pub bitmap: u64,
    pub predicates: PredicateVector,
}

/// Encodes a disclosure scope against a schema.
///
/// # Errors
/// * `UnknownField` for a field the schema does not declare
/// * `PredicateNotSupported` for a predicate the kind does not declare
/// * `MissingPredicateValue` when a comparison predicate has no auxiliary value
pub fn encode(scope: &DisclosureScope, schema: &Schema) -> Result<EncodedScope> {
    let mut bitmap = 0u64;
    for field in &scope.fields {
        let index = schema.index_of(field).ok_or_else(|| CredentialError::UnknownField {
            field: field.clone(),
            kind: schema.kind.to_string(),
        })?;
        bitmap |= 1u64 << index;
    }

    let mut requested = BTreeSet::new();
    for name in &scope.predicates {
        requested.insert(schema.resolve_predicate(name)?);
    }

    for name in scope.predicate_values.keys() {
        let predicate = schema.resolve_predicate(name)?;
        if !predicate.takes_aux() {
            return Err(CredentialError::PredicateNotSupported {
                predicate: format!("{name} (auxiliary value)"),
                kind: schema.kind.to_string(),
            });
        }
        if !requested.contains(&predicate) {
            debug!("Ignoring auxiliary value for unrequested predicate {name}");
        }
    }

    let entries = schema
        .predicates
        .iter()
        .map(|&predicate| {
            let active = requested.contains(&predicate);
            let aux = match (active, predicate.compared_field()) {
                (true, Some(field)) => Some(encode_aux(scope, schema, predicate, field)?),
                _ => None,
            };
            Ok(PredicateEntry { predicate, active, aux })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(EncodedScope {
        bitmap,
        predicates: PredicateVector { entries },
    })
}

fn encode_aux(scope: &DisclosureScope, schema: &Schema, predicate: PredicateId, field: &str) -> Result<FieldElement> {
    let raw = scope
        .predicate_values
        .get(predicate.as_str())
        .ok_or_else(|| CredentialError::MissingPredicateValue(predicate.to_string()))?;
    let spec = schema
        .field(field)
        .ok_or_else(|| CredentialError::UnknownField {
            field: field.to_string(),
            kind: schema.kind.to_string(),
        })?;
    let value = FieldValue::from_json(raw, predicate.as_str())?;
    to_field(&value, spec.ty, predicate.as_str())
}

/// Decodes a bitmap into field names in schema order.
///
/// # Errors
/// `BitmapOutOfRange` if a bit beyond the schema width is set.
pub fn decode(bitmap: u64, schema: &Schema) -> Result<Vec<&'static str>> {
    let width = schema.width();
    if width < 64 && bitmap >> width != 0 {
        return Err(CredentialError::BitmapOutOfRange { bitmap, width });
    }
    Ok(schema
        .fields
        .iter()
        .enumerate()
        .filter(|(i, _)| bitmap & (1u64 << i) != 0)
        .map(|(_, f)| f.name)
        .collect())
}

/// Parses the predicate slot block of a public-input vector.
///
/// # Errors
/// `MalformedPublicInputs` if the block has the wrong length, a flag is not
/// 0 or 1, or an inactive predicate carries a non-zero auxiliary slot.
pub fn decode_predicates(slots: &[FieldElement], schema: &Schema) -> Result<PredicateVector> {
    if slots.len() != schema.predicate_slots() {
        return Err(CredentialError::MalformedPublicInputs(format!(
            "expected {} predicate slots, got {}",
            schema.predicate_slots(),
            slots.len()
        )));
    }

    let mut cursor = slots.iter();
    let mut entries = Vec::with_capacity(schema.predicates.len());
    for &predicate in schema.predicates {
        let active = match cursor.next().and_then(FieldElement::to_u64) {
            Some(0) => false,
            Some(1) => true,
            _ => {
                return Err(CredentialError::MalformedPublicInputs(format!(
                    "flag for `{predicate}` is not 0 or 1"
                )))
            }
        };
        let aux = if predicate.takes_aux() {
            let slot = cursor.next().copied().unwrap_or_else(FieldElement::zero);
            match (active, slot == FieldElement::zero()) {
                (true, _) => Some(slot),
                (false, true) => None,
                (false, false) => {
                    return Err(CredentialError::MalformedPublicInputs(format!(
                        "inactive predicate `{predicate}` carries an auxiliary value"
                    )))
                }
            }
        } else {
            None
        };
        entries.push(PredicateEntry { predicate, active, aux });
    }
    Ok(PredicateVector { entries })
}
