// src/zkp/predicates.rs
//! Reference evaluation of the provable predicates.
//!
//! These mirror the statements the circuit proves over the witness. The holder
//! runs them before requesting a proof so that an unsatisfiable request fails
//! locally instead of inside the prover.

use chrono::{DateTime, Datelike};

use super::field_codec::{to_field, FieldElement, FieldValue};
use crate::error::{CredentialError, Result};
use crate::models::credential::{CredentialAttributes, StudentStatus};
use crate::models::{Credential, PredicateId};

/// 365.25 days.
pub const SECONDS_PER_YEAR: i64 = 31_557_600;

/// Earliest model year accepted by `year_range_check`.
pub const FIRST_MODEL_YEAR: i64 = 1886;

fn whole_years_between(from: i64, to: i64) -> Result<i64> {
    to.checked_sub(from)
        .map(|elapsed| elapsed.div_euclid(SECONDS_PER_YEAR))
        .ok_or_else(|| CredentialError::OutOfRange {
            value: format!("{to} - {from}"),
            context: "age in seconds".into(),
        })
}

fn age_at_least(date_of_birth: i64, now: i64, threshold: i64) -> Result<bool> {
    Ok(whole_years_between(date_of_birth, now)? >= threshold)
}

fn calendar_year(now: i64) -> i64 {
    DateTime::from_timestamp(now, 0)
        .map(|dt| i64::from(dt.year()))
        .unwrap_or(i64::MAX)
}

/// Evaluates one predicate against a credential.
///
/// # Arguments
/// * `predicate` - The predicate to evaluate
/// * `credential` - The full credential (the witness)
/// * `aux` - Public auxiliary value for comparison predicates
/// * `now` - Evaluation time, Unix seconds
///
/// # Errors
/// * `PredicateNotSupported` when the credential kind does not declare the predicate
/// * `MissingPredicateValue` when a comparison predicate has no auxiliary value
/// * `OutOfRange` when the age span does not fit in an `i64`
pub fn evaluate(predicate: PredicateId, credential: &Credential, aux: Option<&FieldElement>, now: i64) -> Result<bool> {
    let schema = credential.schema();
    if !schema.supports(predicate) {
        return Err(CredentialError::PredicateNotSupported {
            predicate: predicate.to_string(),
            kind: schema.kind.to_string(),
        });
    }

    if let Some(field) = predicate.compared_field() {
        let expected = aux.ok_or_else(|| CredentialError::MissingPredicateValue(predicate.to_string()))?;
        let spec = schema.field(field).ok_or_else(|| CredentialError::UnknownField {
            field: field.to_string(),
            kind: schema.kind.to_string(),
        })?;
        let witness = FieldValue::from_json(&credential.field_value(field)?, field)?;
        return Ok(to_field(&witness, spec.ty, field)? == *expected);
    }

    use CredentialAttributes as A;
    use PredicateId as P;
    let holds = match (predicate, &credential.attributes) {
        (P::AgeOver18, A::CollegeId(a)) => age_at_least(a.date_of_birth, now, 18)?,
        (P::AgeOver18, A::CitizenshipCard(a)) => age_at_least(a.date_of_birth, now, 18)?,
        (P::AgeOver18, A::DriversLicense(a)) => age_at_least(a.date_of_birth, now, 18)?,
        (P::AgeOver21, A::CitizenshipCard(a)) => age_at_least(a.date_of_birth, now, 21)?,
        (P::AgeOver21, A::DriversLicense(a)) => age_at_least(a.date_of_birth, now, 21)?,
        (P::YearValid, A::CollegeId(a)) => (1..=4).contains(&a.year_of_study),
        (P::StatusActive, A::CollegeId(a)) => a.student_status == StudentStatus::Active,
        (P::NotExpired, attrs) => now <= attrs.expires_at(),
        (P::RegistrationValid, A::VehicleRegistration(a)) => {
            !a.registration_number.trim().is_empty() && a.registration_date <= now && now <= a.expiry_date
        }
        (P::InsuranceValid, A::VehicleRegistration(a)) => !a.insurance_policy_number.trim().is_empty(),
        (P::YearRangeCheck, A::VehicleRegistration(a)) => {
            (FIRST_MODEL_YEAR..=calendar_year(now).saturating_add(1)).contains(&a.vehicle_year)
        }
        (predicate, _) => {
            return Err(CredentialError::PredicateNotSupported {
                predicate: predicate.to_string(),
                kind: schema.kind.to_string(),
            })
        }
    };
    Ok(holds)
}
