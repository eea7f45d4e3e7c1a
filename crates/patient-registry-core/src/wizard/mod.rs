//! Multi-step registration wizard.
//!
//! ```text
//! Personal → Contact → Address → Medical → Emergency → Review ──submit──┐
//!    ▲                                                                   │
//!    └──────────────────────────── reset on success ─────────────────────┘
//! ```
//!
//! Moving forward requires the current step to validate clean. Moving back is
//! always allowed. Submit re-validates every step and performs exactly one insert.

pub mod form;
pub mod validation;

pub use form::*;
pub use validation::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{Database, DbError};
use crate::models::NewPatient;

/// Wizard steps, in order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    Personal,
    Contact,
    Address,
    Medical,
    Emergency,
    Review,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::Personal,
        Step::Contact,
        Step::Address,
        Step::Medical,
        Step::Emergency,
        Step::Review,
    ];

    /// 1-based position.
    pub fn number(&self) -> u8 {
        match self {
            Step::Personal => 1,
            Step::Contact => 2,
            Step::Address => 3,
            Step::Medical => 4,
            Step::Emergency => 5,
            Step::Review => 6,
        }
    }

    pub fn from_number(number: u8) -> Option<Step> {
        Step::ALL.into_iter().find(|s| s.number() == number)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Step::Personal => "Personal",
            Step::Contact => "Contact",
            Step::Address => "Address",
            Step::Medical => "Medical",
            Step::Emergency => "Emergency",
            Step::Review => "Review",
        }
    }

    pub fn next(&self) -> Option<Step> {
        Step::from_number(self.number() + 1)
    }

    pub fn previous(&self) -> Option<Step> {
        Step::from_number(self.number().checked_sub(1)?)
    }
}

/// Wizard errors. Each one leaves the form intact.
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("Please fix all errors before proceeding")]
    Validation(FieldErrors),

    #[error("Please complete the current step first")]
    StepIncomplete,

    #[error("Already at the first step")]
    AtFirstStep,

    #[error("Already at the last step")]
    AtLastStep,

    #[error("Patients can only be submitted from the review step")]
    NotOnReview,

    #[error("Failed to register patient: {0}")]
    Storage(#[from] DbError),
}

/// Wizard state: current step, field values and the displayed error set.
#[derive(Debug, Clone)]
pub struct Wizard {
    current: Step,
    form: RegistrationForm,
    errors: FieldErrors,
    registered_by: String,
}

impl Wizard {
    /// Start an empty wizard. `registered_by` tags every submitted patient.
    pub fn new(registered_by: impl Into<String>) -> Self {
        Self {
            current: Step::Personal,
            form: RegistrationForm::default(),
            errors: FieldErrors::new(),
            registered_by: registered_by.into(),
        }
    }

    pub fn current_step(&self) -> Step {
        self.current
    }

    pub fn form(&self) -> &RegistrationForm {
        &self.form
    }

    /// Errors currently on display.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Update a field and clear its displayed error.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.form.set(field, value);
        self.errors.remove(&field);
    }

    pub fn is_step_complete(&self, step: Step) -> bool {
        validate_step(step, &self.form).is_empty()
    }

    /// Advance one step if the current step validates clean.
    pub fn next(&mut self) -> Result<Step, WizardError> {
        let target = self.current.next().ok_or(WizardError::AtLastStep)?;
        let errors = validate_step(self.current, &self.form);
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(WizardError::Validation(errors));
        }
        self.current = target;
        self.errors.clear();
        Ok(target)
    }

    /// Go back one step.
    pub fn previous(&mut self) -> Result<Step, WizardError> {
        let target = self.current.previous().ok_or(WizardError::AtFirstStep)?;
        self.current = target;
        Ok(target)
    }

    /// Jump via the step indicator or a Review edit link.
    ///
    /// Earlier steps are always reachable; later ones only while the current
    /// step validates clean.
    pub fn go_to(&mut self, target: Step) -> Result<Step, WizardError> {
        if target <= self.current || self.is_step_complete(self.current) {
            self.current = target;
            Ok(target)
        } else {
            Err(WizardError::StepIncomplete)
        }
    }

    /// Review sections for the current values.
    pub fn review(&self) -> Vec<ReviewSection> {
        self.form.review()
    }

    /// Submit from the Review step. Returns the new patient id.
    ///
    /// On success the wizard resets to an empty form at step one. On failure
    /// every value is kept so the user can retry.
    pub fn submit(&mut self, db: &Database) -> Result<i64, WizardError> {
        if self.current != Step::Review {
            return Err(WizardError::NotOnReview);
        }

        let patient = match NewPatient::from_form(&self.form, &self.registered_by) {
            Ok(patient) => patient,
            Err(errors) => {
                self.errors = errors.clone();
                return Err(WizardError::Validation(errors));
            }
        };

        match db.insert_patient(&patient) {
            Ok(id) => {
                info!(id, "registration submitted");
                self.reset();
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "registration failed");
                Err(e.into())
            }
        }
    }

    /// Clear every field and return to step one.
    pub fn reset(&mut self) {
        self.current = Step::Personal;
        self.form = RegistrationForm::default();
        self.errors.clear();
    }
}
