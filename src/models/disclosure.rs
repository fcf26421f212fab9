// src/models/disclosure.rs
//! Holder-chosen disclosure scope for one presentation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which fields to reveal and which predicates to prove.
///
/// Identifiers stay as plain strings here so that anything the schema does not
/// declare is rejected with a typed error during encoding rather than lost in
/// deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureScope {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub predicates: Vec<String>,
    /// Public auxiliary values keyed by predicate identifier.
    #[serde(default)]
    pub predicate_values: BTreeMap<String, Value>,
}

impl DisclosureScope {
    pub fn new<F, P>(fields: F, predicates: P) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            predicates: predicates.into_iter().map(Into::into).collect(),
            predicate_values: BTreeMap::new(),
        }
    }

    /// Attaches an auxiliary public value to a predicate.
    pub fn with_value(mut self, predicate: &str, value: impl Into<Value>) -> Self {
        self.predicate_values.insert(predicate.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_json() {
        let scope = DisclosureScope::new(["nationality"], ["nationality_match"]).with_value("nationality_match", "Nepal");
        let json = serde_json::to_value(&scope).unwrap();
        assert_eq!(json["predicateValues"]["nationality_match"], "Nepal");

        let parsed: DisclosureScope = serde_json::from_str(r#"{"fields":["program"]}"#).unwrap();
        assert_eq!(parsed.fields, vec!["program".to_string()]);
        assert!(parsed.predicates.is_empty());
    }
}
