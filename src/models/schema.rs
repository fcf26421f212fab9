// src/models/schema.rs
//! Versioned schemas for the four credential kinds.
//!
//! A schema's field list is the canonical order used by the commitment and by
//! the disclosure bitmap: bit `i` of a bitmap refers to `fields[i]`. The
//! predicate list fixes the order of predicate slots in the public inputs.
//! Neither list may change for an existing kind version.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CredentialError, Result};
use crate::zkp::field_codec::FieldType;
use crate::zkp::field_codec::FieldType::{Enum, Integer, Status, Text, Timestamp};

/// The supported credential kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialKind {
    CollegeId,
    CitizenshipCard,
    DriversLicense,
    VehicleRegistration,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 4] = [
        CredentialKind::CollegeId,
        CredentialKind::CitizenshipCard,
        CredentialKind::DriversLicense,
        CredentialKind::VehicleRegistration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollegeId => "college-id",
            Self::CitizenshipCard => "citizenship-card",
            Self::DriversLicense => "drivers-license",
            Self::VehicleRegistration => "vehicle-registration",
        }
    }

    /// Numeric code mixed into the commitment domain tag.
    pub fn code(&self) -> u64 {
        match self {
            Self::CollegeId => 1,
            Self::CitizenshipCard => 2,
            Self::DriversLicense => 3,
            Self::VehicleRegistration => 4,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        match self {
            Self::CollegeId => &COLLEGE_ID,
            Self::CitizenshipCard => &CITIZENSHIP_CARD,
            Self::DriversLicense => &DRIVERS_LICENSE,
            Self::VehicleRegistration => &VEHICLE_REGISTRATION,
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialKind {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CredentialError::UnknownCredentialType(s.to_string()))
    }
}

/// Predicates a holder may prove without revealing the underlying fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateId {
    #[serde(rename = "age_over_18")]
    AgeOver18,
    #[serde(rename = "age_over_21")]
    AgeOver21,
    YearValid,
    StatusActive,
    NotExpired,
    NationalityMatch,
    ClassMatch,
    RegistrationValid,
    InsuranceValid,
    YearRangeCheck,
}

impl PredicateId {
    const ALL: [PredicateId; 10] = [
        PredicateId::AgeOver18,
        PredicateId::AgeOver21,
        PredicateId::YearValid,
        PredicateId::StatusActive,
        PredicateId::NotExpired,
        PredicateId::NationalityMatch,
        PredicateId::ClassMatch,
        PredicateId::RegistrationValid,
        PredicateId::InsuranceValid,
        PredicateId::YearRangeCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgeOver18 => "age_over_18",
            Self::AgeOver21 => "age_over_21",
            Self::YearValid => "year_valid",
            Self::StatusActive => "status_active",
            Self::NotExpired => "not_expired",
            Self::NationalityMatch => "nationality_match",
            Self::ClassMatch => "class_match",
            Self::RegistrationValid => "registration_valid",
            Self::InsuranceValid => "insurance_valid",
            Self::YearRangeCheck => "year_range_check",
        }
    }

    /// Hidden field compared against a public auxiliary value, if any.
    pub fn compared_field(&self) -> Option<&'static str> {
        match self {
            Self::NationalityMatch => Some("nationality"),
            Self::ClassMatch => Some("vehicleClass"),
            _ => None,
        }
    }

    pub fn takes_aux(&self) -> bool {
        self.compared_field().is_some()
    }

    /// Number of public-input slots the predicate occupies.
    pub fn slot_count(&self) -> usize {
        if self.takes_aux() {
            2
        } else {
            1
        }
    }
}

impl fmt::Display for PredicateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredicateId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// One schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    /// Required fields must be present and non-blank at issuance.
    pub required: bool,
}

const fn req(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec { name, ty, required: true }
}

const fn opt(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec { name, ty, required: false }
}

/// A versioned credential schema.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    pub kind: CredentialKind,
    pub version: u64,
    pub fields: &'static [FieldSpec],
    pub predicates: &'static [PredicateId],
    /// Field that carries the holder's public key.
    pub holder_key_field: &'static str,
    pub issued_at_field: &'static str,
    pub expires_at_field: &'static str,
}

impl Schema {
    /// Bitmap width.
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn supports(&self, predicate: PredicateId) -> bool {
        self.predicates.contains(&predicate)
    }

    /// Offset of a predicate's flag within the predicate slot block.
    pub fn predicate_offset(&self, predicate: PredicateId) -> Option<usize> {
        let mut offset = 0;
        for p in self.predicates {
            if *p == predicate {
                return Some(offset);
            }
            offset += p.slot_count();
        }
        None
    }

    /// Total number of predicate slots.
    pub fn predicate_slots(&self) -> usize {
        self.predicates.iter().map(PredicateId::slot_count).sum()
    }

    /// Resolves a predicate identifier for this kind.
    pub fn resolve_predicate(&self, name: &str) -> Result<PredicateId> {
        let not_supported = || CredentialError::PredicateNotSupported {
            predicate: name.to_string(),
            kind: self.kind.to_string(),
        };
        let predicate = PredicateId::from_str(name).map_err(|_| not_supported())?;
        if self.supports(predicate) {
            Ok(predicate)
        } else {
            Err(not_supported())
        }
    }

    /// Domain tag absorbed first by the commitment hash.
    pub fn domain_tag(&self) -> u64 {
        self.kind.code() * 256 + self.version
    }
}

const GENDERS: &[&str] = &["male", "female", "other"];

static COLLEGE_ID_FIELDS: [FieldSpec; 12] = [
    req("fullName", Text),
    req("institutionName", Text),
    req("program", Text),
    req("yearOfStudy", Integer),
    req("studentStatus", Status("active", "inactive")),
    req("dateOfBirth", Timestamp),
    req("studentId", Text),
    req("issueDate", Timestamp),
    req("expiryDate", Timestamp),
    opt("photoHash", Text),
    req("holderPublicKey", Text),
    req("issuerId", Text),
];

static CITIZENSHIP_CARD_FIELDS: [FieldSpec; 13] = [
    req("fullName", Text),
    req("nationality", Text),
    req("gender", Enum(GENDERS)),
    req("residentialAddress", Text),
    req("dateOfBirth", Timestamp),
    req("nationalIdNumber", Text),
    opt("placeOfBirth", Text),
    req("issueDate", Timestamp),
    req("expiryDate", Timestamp),
    opt("biometricHash", Text),
    opt("photoHash", Text),
    req("holderPublicKey", Text),
    req("issuingAuthority", Text),
];

static DRIVERS_LICENSE_FIELDS: [FieldSpec; 12] = [
    req("fullName", Text),
    req("licenseNumber", Text),
    req("vehicleClass", Text),
    opt("restrictions", Text),
    req("dateOfBirth", Timestamp),
    req("issuingStateOrAuthority", Text),
    req("issueDate", Timestamp),
    req("expiryDate", Timestamp),
    opt("endorsements", Text),
    opt("address", Text),
    opt("photoHash", Text),
    req("holderPublicKey", Text),
];

static VEHICLE_REGISTRATION_FIELDS: [FieldSpec; 13] = [
    req("registrationNumber", Text),
    req("ownerName", Text),
    req("vehicleMake", Text),
    req("vehicleModel", Text),
    req("vehicleYear", Integer),
    req("ownerPublicKey", Text),
    req("vehicleVIN", Text),
    req("engineNumber", Text),
    req("registrationDate", Timestamp),
    req("expiryDate", Timestamp),
    opt("insurancePolicyNumber", Text),
    req("issuingAuthority", Text),
    opt("photoHash", Text),
];

pub static COLLEGE_ID: Schema = Schema {
    kind: CredentialKind::CollegeId,
    version: 1,
    fields: &COLLEGE_ID_FIELDS,
    predicates: &[PredicateId::AgeOver18, PredicateId::YearValid, PredicateId::StatusActive],
    holder_key_field: "holderPublicKey",
    issued_at_field: "issueDate",
    expires_at_field: "expiryDate",
};

pub static CITIZENSHIP_CARD: Schema = Schema {
    kind: CredentialKind::CitizenshipCard,
    version: 1,
    fields: &CITIZENSHIP_CARD_FIELDS,
    predicates: &[
        PredicateId::AgeOver18,
        PredicateId::AgeOver21,
        PredicateId::NationalityMatch,
        PredicateId::NotExpired,
    ],
    holder_key_field: "holderPublicKey",
    issued_at_field: "issueDate",
    expires_at_field: "expiryDate",
};

pub static DRIVERS_LICENSE: Schema = Schema {
    kind: CredentialKind::DriversLicense,
    version: 1,
    fields: &DRIVERS_LICENSE_FIELDS,
    predicates: &[
        PredicateId::AgeOver18,
        PredicateId::AgeOver21,
        PredicateId::ClassMatch,
        PredicateId::NotExpired,
    ],
    holder_key_field: "holderPublicKey",
    issued_at_field: "issueDate",
    expires_at_field: "expiryDate",
};

pub static VEHICLE_REGISTRATION: Schema = Schema {
    kind: CredentialKind::VehicleRegistration,
    version: 1,
    fields: &VEHICLE_REGISTRATION_FIELDS,
    predicates: &[
        PredicateId::RegistrationValid,
        PredicateId::InsuranceValid,
        PredicateId::YearRangeCheck,
    ],
    holder_key_field: "ownerPublicKey",
    issued_at_field: "registrationDate",
    expires_at_field: "expiryDate",
};
