//! Registration form state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Step;
use crate::models::NOT_AVAILABLE;

/// A user-editable registration field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FirstName,
    LastName,
    DateOfBirth,
    Gender,
    Phone,
    Email,
    StreetAddress,
    City,
    State,
    PostalCode,
    MedicalRecordNumber,
    Allergies,
    PreExistingConditions,
    EmergencyContactName,
    EmergencyContactPhone,
}

impl Field {
    /// Every field, in insert order.
    pub const ALL: [Field; 15] = [
        Field::FirstName,
        Field::LastName,
        Field::DateOfBirth,
        Field::Gender,
        Field::Phone,
        Field::Email,
        Field::StreetAddress,
        Field::City,
        Field::State,
        Field::PostalCode,
        Field::MedicalRecordNumber,
        Field::Allergies,
        Field::PreExistingConditions,
        Field::EmergencyContactName,
        Field::EmergencyContactPhone,
    ];

    /// Column name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::DateOfBirth => "date_of_birth",
            Field::Gender => "gender",
            Field::Phone => "phone",
            Field::Email => "email",
            Field::StreetAddress => "street_address",
            Field::City => "city",
            Field::State => "state",
            Field::PostalCode => "postal_code",
            Field::MedicalRecordNumber => "medical_record_number",
            Field::Allergies => "allergies",
            Field::PreExistingConditions => "pre_existing_conditions",
            Field::EmergencyContactName => "emergency_contact_name",
            Field::EmergencyContactPhone => "emergency_contact_phone",
        }
    }

    /// The step on which this field is entered.
    pub fn step(&self) -> Step {
        match self {
            Field::FirstName | Field::LastName | Field::DateOfBirth | Field::Gender => {
                Step::Personal
            }
            Field::Phone | Field::Email => Step::Contact,
            Field::StreetAddress | Field::City | Field::State | Field::PostalCode => Step::Address,
            Field::MedicalRecordNumber | Field::Allergies | Field::PreExistingConditions => {
                Step::Medical
            }
            Field::EmergencyContactName | Field::EmergencyContactPhone => Step::Emergency,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown field: {0}")]
pub struct ParseFieldError(pub String);

impl FromStr for Field {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| ParseFieldError(s.to_string()))
    }
}

/// Raw field values as typed by the user. All start empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub phone: String,
    pub email: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub medical_record_number: String,
    pub allergies: String,
    pub pre_existing_conditions: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
}

impl RegistrationForm {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::DateOfBirth => &self.date_of_birth,
            Field::Gender => &self.gender,
            Field::Phone => &self.phone,
            Field::Email => &self.email,
            Field::StreetAddress => &self.street_address,
            Field::City => &self.city,
            Field::State => &self.state,
            Field::PostalCode => &self.postal_code,
            Field::MedicalRecordNumber => &self.medical_record_number,
            Field::Allergies => &self.allergies,
            Field::PreExistingConditions => &self.pre_existing_conditions,
            Field::EmergencyContactName => &self.emergency_contact_name,
            Field::EmergencyContactPhone => &self.emergency_contact_phone,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::DateOfBirth => &mut self.date_of_birth,
            Field::Gender => &mut self.gender,
            Field::Phone => &mut self.phone,
            Field::Email => &mut self.email,
            Field::StreetAddress => &mut self.street_address,
            Field::City => &mut self.city,
            Field::State => &mut self.state,
            Field::PostalCode => &mut self.postal_code,
            Field::MedicalRecordNumber => &mut self.medical_record_number,
            Field::Allergies => &mut self.allergies,
            Field::PreExistingConditions => &mut self.pre_existing_conditions,
            Field::EmergencyContactName => &mut self.emergency_contact_name,
            Field::EmergencyContactPhone => &mut self.emergency_contact_phone,
        };
        *slot = value.into();
    }

    /// Sections shown on the Review step, each linking back to its step.
    pub fn review(&self) -> Vec<ReviewSection> {
        let entry = |label: &'static str, field: Field| ReviewField {
            label,
            value: or_placeholder(self.get(field), NOT_AVAILABLE),
        };
        let optional = |label: &'static str, field: Field| ReviewField {
            label,
            value: or_placeholder(self.get(field), "None"),
        };

        vec![
            ReviewSection {
                title: "Personal Information",
                step: Step::Personal,
                fields: vec![
                    entry("First Name", Field::FirstName),
                    entry("Last Name", Field::LastName),
                    entry("Date of Birth", Field::DateOfBirth),
                    entry("Gender", Field::Gender),
                ],
            },
            ReviewSection {
                title: "Contact Information",
                step: Step::Contact,
                fields: vec![entry("Phone", Field::Phone), entry("Email", Field::Email)],
            },
            ReviewSection {
                title: "Address Information",
                step: Step::Address,
                fields: vec![
                    entry("Street Address", Field::StreetAddress),
                    entry("City", Field::City),
                    entry("State", Field::State),
                    entry("Postal Code", Field::PostalCode),
                ],
            },
            ReviewSection {
                title: "Medical Information",
                step: Step::Medical,
                fields: vec![
                    entry("Medical Record Number", Field::MedicalRecordNumber),
                    optional("Allergies", Field::Allergies),
                    optional("Pre-existing Conditions", Field::PreExistingConditions),
                ],
            },
            ReviewSection {
                title: "Emergency Contact",
                step: Step::Emergency,
                fields: vec![
                    entry("Name", Field::EmergencyContactName),
                    entry("Phone", Field::EmergencyContactPhone),
                ],
            },
        ]
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

/// One group of values on the Review step.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewSection {
    pub title: &'static str,
    /// Step to jump back to for editing
    pub step: Step,
    pub fields: Vec<ReviewField>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewField {
    pub label: &'static str,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(field.as_str().parse::<Field>(), Ok(field));
        }
        assert!("registered_by".parse::<Field>().is_err());
    }

    #[test]
    fn test_get_and_set() {
        let mut form = RegistrationForm::default();
        for field in Field::ALL {
            form.set(field, format!("value of {}", field));
        }
        for field in Field::ALL {
            assert_eq!(form.get(field), format!("value of {}", field));
        }
    }

    #[test]
    fn test_every_entry_step_has_fields() {
        for step in [Step::Personal, Step::Contact, Step::Address, Step::Medical, Step::Emergency] {
            assert!(Field::ALL.iter().any(|f| f.step() == step));
        }
        assert!(!Field::ALL.iter().any(|f| f.step() == Step::Review));
    }

    #[test]
    fn test_review_placeholders() {
        let mut form = RegistrationForm::default();
        form.set(Field::FirstName, "Ada");

        let sections = form.review();
        assert_eq!(sections.len(), 5);
        assert_eq!(sections[0].fields[0].value, "Ada");
        assert_eq!(sections[0].fields[1].value, "N/A");

        let medical = &sections[3];
        assert_eq!(medical.step, Step::Medical);
        assert_eq!(medical.fields[1].label, "Allergies");
        assert_eq!(medical.fields[1].value, "None");
    }
}
