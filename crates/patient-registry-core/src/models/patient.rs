//! Patient models.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::dates::{normalize_date, normalize_timestamp};

/// Administrative gender as captured at registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Gender {
    Male,
    Female,
    #[serde(rename = "Non-binary")]
    NonBinary,
    Other,
}

impl Gender {
    /// All selectable values, in display order.
    pub const ALL: [Gender; 4] = [
        Gender::Male,
        Gender::Female,
        Gender::NonBinary,
        Gender::Other,
    ];

    /// Stored/display representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::NonBinary => "Non-binary",
            Gender::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown gender: {0}")]
pub struct ParseGenderError(pub String);

impl FromStr for Gender {
    type Err = ParseGenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| ParseGenderError(s.to_string()))
    }
}

impl ToSql for Gender {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Gender {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse::<Gender>()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A validated registration, ready to be written.
///
/// `id` and `registration_date` are absent: the engine assigns both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`
    pub date_of_birth: chrono::NaiveDate,
    pub gender: Gender,
    pub phone: String,
    pub email: Option<String>,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    /// Globally unique
    pub medical_record_number: String,
    pub allergies: Option<String>,
    pub pre_existing_conditions: Option<String>,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    /// Tag identifying the registering agent
    pub registered_by: String,
}

/// A stored patient record. Append-only: never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Engine-assigned, never reused
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Raw stored date text
    pub date_of_birth: String,
    pub gender: Gender,
    pub phone: String,
    pub email: Option<String>,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub medical_record_number: String,
    pub allergies: Option<String>,
    pub pre_existing_conditions: Option<String>,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    /// Raw stored timestamp text (UTC)
    pub registration_date: String,
    pub registered_by: String,
}

impl Patient {
    /// Full display name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Presentation projection of a [`Patient`] with normalized date columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`
    pub date_of_birth: String,
    pub gender: Gender,
    pub phone: String,
    pub email: Option<String>,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub medical_record_number: String,
    pub allergies: Option<String>,
    pub pre_existing_conditions: Option<String>,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub registration_date: String,
    pub registered_by: String,
}

impl From<&Patient> for PatientRow {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id,
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            date_of_birth: normalize_date(&p.date_of_birth),
            gender: p.gender,
            phone: p.phone.clone(),
            email: p.email.clone(),
            street_address: p.street_address.clone(),
            city: p.city.clone(),
            state: p.state.clone(),
            postal_code: p.postal_code.clone(),
            medical_record_number: p.medical_record_number.clone(),
            allergies: p.allergies.clone(),
            pre_existing_conditions: p.pre_existing_conditions.clone(),
            emergency_contact_name: p.emergency_contact_name.clone(),
            emergency_contact_phone: p.emergency_contact_phone.clone(),
            registration_date: normalize_timestamp(&p.registration_date),
            registered_by: p.registered_by.clone(),
        }
    }
}

impl From<Patient> for PatientRow {
    fn from(p: Patient) -> Self {
        PatientRow::from(&p)
    }
}
