// src/models/credential.rs
//! Credential data model.
//!
//! A credential is a closed tagged variant, one variant per kind, wrapped in
//! an envelope carrying the issuer-assigned identifier and the per-issuance
//! commitment freshness material. Credentials are immutable once issued;
//! reissuance creates a new `credentialId`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CredentialError, Result};
use crate::models::schema::{CredentialKind, Schema};
use crate::zkp::field_codec::{hex_to_field, to_field, FieldElement, FieldValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegeIdAttributes {
    pub full_name: String,
    pub institution_name: String,
    pub program: String,
    pub year_of_study: i64,
    pub student_status: StudentStatus,
    pub date_of_birth: i64,
    pub student_id: String,
    pub issue_date: i64,
    pub expiry_date: i64,
    #[serde(default)]
    pub photo_hash: String,
    pub holder_public_key: String,
    pub issuer_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitizenshipCardAttributes {
    pub full_name: String,
    pub nationality: String,
    pub gender: Gender,
    pub residential_address: String,
    pub date_of_birth: i64,
    pub national_id_number: String,
    #[serde(default)]
    pub place_of_birth: String,
    pub issue_date: i64,
    pub expiry_date: i64,
    #[serde(default)]
    pub biometric_hash: String,
    #[serde(default)]
    pub photo_hash: String,
    pub holder_public_key: String,
    pub issuing_authority: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriversLicenseAttributes {
    pub full_name: String,
    pub license_number: String,
    pub vehicle_class: String,
    #[serde(default)]
    pub restrictions: String,
    pub date_of_birth: i64,
    pub issuing_state_or_authority: String,
    pub issue_date: i64,
    pub expiry_date: i64,
    #[serde(default)]
    pub endorsements: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub photo_hash: String,
    pub holder_public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRegistrationAttributes {
    pub registration_number: String,
    pub owner_name: String,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub vehicle_year: i64,
    pub owner_public_key: String,
    #[serde(rename = "vehicleVIN")]
    pub vehicle_vin: String,
    pub engine_number: String,
    pub registration_date: i64,
    pub expiry_date: i64,
    #[serde(default)]
    pub insurance_policy_number: String,
    pub issuing_authority: String,
    #[serde(default)]
    pub photo_hash: String,
}

/// Kind-specific attributes of a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "credentialType", content = "fields", rename_all = "kebab-case")]
pub enum CredentialAttributes {
    CollegeId(CollegeIdAttributes),
    CitizenshipCard(CitizenshipCardAttributes),
    DriversLicense(DriversLicenseAttributes),
    VehicleRegistration(VehicleRegistrationAttributes),
}

impl CredentialAttributes {
    pub fn kind(&self) -> CredentialKind {
        match self {
            Self::CollegeId(_) => CredentialKind::CollegeId,
            Self::CitizenshipCard(_) => CredentialKind::CitizenshipCard,
            Self::DriversLicense(_) => CredentialKind::DriversLicense,
            Self::VehicleRegistration(_) => CredentialKind::VehicleRegistration,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.kind().schema()
    }

    pub fn holder_public_key(&self) -> &str {
        match self {
            Self::CollegeId(a) => &a.holder_public_key,
            Self::CitizenshipCard(a) => &a.holder_public_key,
            Self::DriversLicense(a) => &a.holder_public_key,
            Self::VehicleRegistration(a) => &a.owner_public_key,
        }
    }

    pub fn issued_at(&self) -> i64 {
        match self {
            Self::CollegeId(a) => a.issue_date,
            Self::CitizenshipCard(a) => a.issue_date,
            Self::DriversLicense(a) => a.issue_date,
            Self::VehicleRegistration(a) => a.registration_date,
        }
    }

    pub fn expires_at(&self) -> i64 {
        match self {
            Self::CollegeId(a) => a.expiry_date,
            Self::CitizenshipCard(a) => a.expiry_date,
            Self::DriversLicense(a) => a.expiry_date,
            Self::VehicleRegistration(a) => a.expiry_date,
        }
    }

    /// Attribute values keyed by schema field name.
    pub fn field_map(&self) -> Result<Map<String, Value>> {
        let value = match self {
            Self::CollegeId(a) => serde_json::to_value(a)?,
            Self::CitizenshipCard(a) => serde_json::to_value(a)?,
            Self::DriversLicense(a) => serde_json::to_value(a)?,
            Self::VehicleRegistration(a) => serde_json::to_value(a)?,
        };
        match value {
            Value::Object(map) => Ok(map),
            other => Err(CredentialError::MalformedCredential(format!(
                "attributes must serialize to an object, got {other}"
            ))),
        }
    }
}

/// A credential as issued to a holder.
///
/// # Fields
/// - `credential_id`: issuer-assigned unique identifier
/// - `nonce`, `salt`: hex-encoded 32-byte freshness material, unique per issuance
/// - `attributes`: the kind-specific field values
///
/// # Security Considerations
/// - `nonce` and `salt` are secret; reusing them across issuances links presentations
/// - The commitment hides nothing by itself; field privacy comes from the proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub credential_id: String,
    pub nonce: String,
    pub salt: String,
    pub attributes: CredentialAttributes,
}

impl Credential {
    pub fn kind(&self) -> CredentialKind {
        self.attributes.kind()
    }

    pub fn schema(&self) -> &'static Schema {
        self.attributes.schema()
    }

    pub fn holder_public_key(&self) -> &str {
        self.attributes.holder_public_key()
    }

    pub fn issued_at(&self) -> i64 {
        self.attributes.issued_at()
    }

    pub fn expires_at(&self) -> i64 {
        self.attributes.expires_at()
    }

    /// Raw JSON value of a schema field.
    ///
    /// # Errors
    /// `UnknownField` if the schema does not declare `name`.
    pub fn field_value(&self, name: &str) -> Result<Value> {
        let schema = self.schema();
        if schema.index_of(name).is_none() {
            return Err(CredentialError::UnknownField {
                field: name.to_string(),
                kind: schema.kind.to_string(),
            });
        }
        self.attributes
            .field_map()?
            .remove(name)
            .ok_or_else(|| CredentialError::MalformedCredential(format!("missing field `{name}`")))
    }

    /// Field-encoded attribute values in schema order.
    ///
    /// # Errors
    /// * `MalformedCredential` if a required field is missing or blank
    /// * `OutOfRange` if a numeric value cannot be encoded
    pub fn canonical_fields(&self) -> Result<Vec<FieldElement>> {
        let schema = self.schema();
        let map = self.attributes.field_map()?;
        schema
            .fields
            .iter()
            .map(|spec| {
                let raw = map.get(spec.name).ok_or_else(|| {
                    CredentialError::MalformedCredential(format!("missing field `{}`", spec.name))
                })?;
                let value = FieldValue::from_json(raw, spec.name)?;
                if spec.required && value.is_blank() {
                    return Err(CredentialError::MalformedCredential(format!(
                        "required field `{}` is blank",
                        spec.name
                    )));
                }
                to_field(&value, spec.ty, spec.name)
            })
            .collect()
    }

    pub fn credential_id_field(&self) -> FieldElement {
        FieldElement::hash_text(&self.credential_id)
    }

    pub fn nonce_field(&self) -> Result<FieldElement> {
        hex_to_field(&self.nonce, "nonce")
    }

    pub fn salt_field(&self) -> Result<FieldElement> {
        hex_to_field(&self.salt, "salt")
    }

    /// Checks the envelope and every schema field.
    pub fn validate(&self) -> Result<()> {
        if self.credential_id.trim().is_empty() {
            return Err(CredentialError::MalformedCredential("credentialId is blank".into()));
        }
        self.nonce_field()?;
        self.salt_field()?;
        if self.expires_at() < self.issued_at() {
            return Err(CredentialError::MalformedCredential(
                "expiry precedes issuance".into(),
            ));
        }
        self.canonical_fields().map(|_| ())
    }
}

/// A credential together with the issuer's attestation over its commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedCredential {
    pub credential: Credential,
    pub commitment: FieldElement,
    /// SEC1 compressed secp256k1 key, `0x` hex.
    pub issuer_public_key: String,
    /// Compact 64-byte ECDSA signature, `0x` hex.
    pub signature: String,
}

impl SignedCredential {
    pub fn credential_id(&self) -> &str {
        &self.credential.credential_id
    }
}
