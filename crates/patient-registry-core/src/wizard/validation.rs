//! Per-step field validators.
//!
//! Every validator is a pure function of the form. A step is complete iff its
//! validator returns no errors.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::form::{Field, RegistrationForm};
use super::Step;
use crate::models::{parse_date, Gender, NewPatient};

/// Human-readable error per offending field.
pub type FieldErrors = BTreeMap<Field, String>;

/// Optional leading `+`, then at least ten digits, spaces or hyphens.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d\s-]{10,}$").unwrap());
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

pub fn is_valid_phone(value: &str) -> bool {
    PHONE_RE.is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

fn require(errors: &mut FieldErrors, form: &RegistrationForm, field: Field, message: &str) {
    if form.get(field).trim().is_empty() {
        errors.insert(field, message.to_string());
    }
}

fn require_phone(errors: &mut FieldErrors, form: &RegistrationForm, field: Field, message: &str) {
    let value = form.get(field);
    if value.is_empty() {
        errors.insert(field, message.to_string());
    } else if !is_valid_phone(value) {
        errors.insert(field, "Invalid phone number format".to_string());
    }
}

pub fn validate_personal(form: &RegistrationForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, form, Field::FirstName, "First name is required");
    require(&mut errors, form, Field::LastName, "Last name is required");

    if form.date_of_birth.is_empty() {
        errors.insert(Field::DateOfBirth, "Date of birth is required".into());
    } else if parse_date(&form.date_of_birth).is_none() {
        errors.insert(Field::DateOfBirth, "Invalid date of birth".into());
    }

    if form.gender.is_empty() {
        errors.insert(Field::Gender, "Gender is required".into());
    } else if form.gender.parse::<Gender>().is_err() {
        errors.insert(Field::Gender, "Invalid gender".into());
    }
    errors
}

pub fn validate_contact(form: &RegistrationForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require_phone(&mut errors, form, Field::Phone, "Phone number is required");

    if !form.email.is_empty() && !is_valid_email(&form.email) {
        errors.insert(Field::Email, "Invalid email format".into());
    }
    errors
}

pub fn validate_address(form: &RegistrationForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, form, Field::StreetAddress, "Street address is required");
    require(&mut errors, form, Field::City, "City is required");
    require(&mut errors, form, Field::State, "State is required");
    require(&mut errors, form, Field::PostalCode, "Postal code is required");
    errors
}

pub fn validate_medical(form: &RegistrationForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(
        &mut errors,
        form,
        Field::MedicalRecordNumber,
        "Medical record number is required",
    );
    errors
}

pub fn validate_emergency(form: &RegistrationForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(
        &mut errors,
        form,
        Field::EmergencyContactName,
        "Emergency contact name is required",
    );
    require_phone(
        &mut errors,
        form,
        Field::EmergencyContactPhone,
        "Emergency contact phone is required",
    );
    errors
}

/// Validate one step. Review has nothing of its own to check.
pub fn validate_step(step: Step, form: &RegistrationForm) -> FieldErrors {
    match step {
        Step::Personal => validate_personal(form),
        Step::Contact => validate_contact(form),
        Step::Address => validate_address(form),
        Step::Medical => validate_medical(form),
        Step::Emergency => validate_emergency(form),
        Step::Review => FieldErrors::new(),
    }
}

/// Validate every data-entry step, merging the results.
pub fn validate_all(form: &RegistrationForm) -> FieldErrors {
    Step::ALL
        .into_iter()
        .flat_map(|step| validate_step(step, form))
        .collect()
}

fn optional(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl NewPatient {
    /// Build a writable record from a form that passes every validator.
    pub fn from_form(form: &RegistrationForm, registered_by: &str) -> Result<Self, FieldErrors> {
        let errors = validate_all(form);
        if !errors.is_empty() {
            return Err(errors);
        }

        let invalid = |field: Field, message: &str| {
            FieldErrors::from([(field, message.to_string())])
        };
        let date_of_birth = parse_date(&form.date_of_birth)
            .ok_or_else(|| invalid(Field::DateOfBirth, "Invalid date of birth"))?;
        let gender = form
            .gender
            .parse::<Gender>()
            .map_err(|_| invalid(Field::Gender, "Invalid gender"))?;

        Ok(NewPatient {
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            date_of_birth,
            gender,
            phone: form.phone.clone(),
            email: optional(&form.email),
            street_address: form.street_address.clone(),
            city: form.city.clone(),
            state: form.state.clone(),
            postal_code: form.postal_code.clone(),
            medical_record_number: form.medical_record_number.clone(),
            allergies: optional(&form.allergies),
            pre_existing_conditions: optional(&form.pre_existing_conditions),
            emergency_contact_name: form.emergency_contact_name.clone(),
            emergency_contact_phone: form.emergency_contact_phone.clone(),
            registered_by: registered_by.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_form() -> RegistrationForm {
        RegistrationForm {
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            date_of_birth: "1906-12-09".into(),
            gender: "Female".into(),
            phone: "+1 555-123-4567".into(),
            email: String::new(),
            street_address: "1 Navy Yard".into(),
            city: "Arlington".into(),
            state: "VA".into(),
            postal_code: "22202".into(),
            medical_record_number: "MRN-001".into(),
            allergies: String::new(),
            pre_existing_conditions: String::new(),
            emergency_contact_name: "Vincent Hopper".into(),
            emergency_contact_phone: "555 987 6543".into(),
        }
    }

    #[test]
    fn test_valid_form_has_no_errors() {
        assert!(validate_all(&valid_form()).is_empty());
    }

    #[test]
    fn test_phone_pattern() {
        assert!(is_valid_phone("+1 555-123-4567"));
        assert!(is_valid_phone("5551234567"));
        assert!(is_valid_phone("555 123 4567"));
        assert!(!is_valid_phone("555-1234"));
        assert!(!is_valid_phone("(555) 123-4567"));
        assert!(!is_valid_phone("++15551234567"));
        assert!(!is_valid_phone("555.123.4567"));
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@clinic.example.org"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
    }

    #[test]
    fn test_personal_required_fields() {
        let errors = validate_personal(&RegistrationForm::default());
        assert_eq!(errors.len(), 4);
        assert_eq!(errors[&Field::FirstName], "First name is required");
        assert_eq!(errors[&Field::Gender], "Gender is required");
    }

    #[test]
    fn test_whitespace_only_names_rejected() {
        let mut form = valid_form();
        form.first_name = "   ".into();
        let errors = validate_personal(&form);
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec![&Field::FirstName]);
    }

    #[test]
    fn test_personal_rejects_malformed_values() {
        let mut form = valid_form();
        form.date_of_birth = "12/09/1906".into();
        form.gender = "female".into();
        let errors = validate_personal(&form);
        assert_eq!(errors[&Field::DateOfBirth], "Invalid date of birth");
        assert_eq!(errors[&Field::Gender], "Invalid gender");
    }

    #[test]
    fn test_contact_errors() {
        let mut form = valid_form();
        form.phone = String::new();
        form.email = "nope".into();
        let errors = validate_contact(&form);
        assert_eq!(errors[&Field::Phone], "Phone number is required");
        assert_eq!(errors[&Field::Email], "Invalid email format");

        form.phone = "12345".into();
        assert_eq!(
            validate_contact(&form)[&Field::Phone],
            "Invalid phone number format"
        );
    }

    #[test]
    fn test_emergency_errors() {
        let mut form = valid_form();
        form.emergency_contact_name = String::new();
        form.emergency_contact_phone = "call me".into();
        let errors = validate_emergency(&form);
        assert_eq!(
            errors[&Field::EmergencyContactName],
            "Emergency contact name is required"
        );
        assert_eq!(
            errors[&Field::EmergencyContactPhone],
            "Invalid phone number format"
        );
    }

    #[test]
    fn test_review_step_always_clean() {
        assert!(validate_step(Step::Review, &RegistrationForm::default()).is_empty());
    }

    #[test]
    fn test_errors_belong_to_their_step() {
        let form = RegistrationForm::default();
        for step in Step::ALL {
            for field in validate_step(step, &form).keys() {
                assert_eq!(field.step(), step);
            }
        }
    }

    #[test]
    fn test_from_form() {
        let patient = NewPatient::from_form(&valid_form(), "medblocks").unwrap();
        assert_eq!(patient.gender, Gender::Female);
        assert_eq!(patient.date_of_birth.to_string(), "1906-12-09");
        assert_eq!(patient.email, None);
        assert_eq!(patient.registered_by, "medblocks");
    }

    #[test]
    fn test_from_form_reports_all_errors() {
        let mut form = valid_form();
        form.city = String::new();
        form.medical_record_number = String::new();
        let errors = NewPatient::from_form(&form, "medblocks").unwrap_err();
        assert!(errors.contains_key(&Field::City));
        assert!(errors.contains_key(&Field::MedicalRecordNumber));
    }

    proptest! {
        #[test]
        fn prop_validators_are_pure(
            first in ".{0,12}",
            phone in "[+0-9 -]{0,16}",
            email in "[a-z@. ]{0,12}",
            dob in "[0-9-]{0,10}",
        ) {
            let mut form = valid_form();
            form.first_name = first;
            form.phone = phone;
            form.email = email;
            form.date_of_birth = dob;

            for step in Step::ALL {
                prop_assert_eq!(validate_step(step, &form), validate_step(step, &form));
            }
        }

        #[test]
        fn prop_digit_runs_are_valid_phones(digits in "[0-9]{10,15}") {
            prop_assert!(is_valid_phone(&digits));
            let with_plus = format!("+{}", digits);
            prop_assert!(is_valid_phone(&with_plus));
        }
    }
}
