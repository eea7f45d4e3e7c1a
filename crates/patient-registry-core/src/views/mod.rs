//! Read-side views over the patient table.
//!
//! Views never query on their own: they are fed [`Fetch`]es, either by the
//! host or by a [`Poller`]. Every fetch is numbered by its database when
//! issued, so a slow response can never overwrite a newer one.

mod list;
mod poller;
mod table;

pub use list::*;
pub use poller::*;
pub use table::*;

use crate::db::Database;
use crate::models::PatientRow;

/// Result of one full reload of the patient list.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetch {
    /// Issue order among fetches from the same database
    pub seq: u64,
    pub result: Result<Vec<PatientRow>, String>,
}

impl Fetch {
    /// Reload every patient, normalized for display.
    pub fn run(db: &Database) -> Fetch {
        let seq = db.next_fetch_seq();
        let result = db
            .list_patients()
            .map(|patients| patients.iter().map(PatientRow::from).collect())
            .map_err(|e| e.to_string());
        Fetch { seq, result }
    }

    /// A failed fetch (e.g. the database could not be reached).
    pub fn failed(db: &Database, message: impl Into<String>) -> Fetch {
        Fetch {
            seq: db.next_fetch_seq(),
            result: Err(message.into()),
        }
    }
}

/// Last applied fetch state shared by the list and table views.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    rows: Vec<PatientRow>,
    error: Option<String>,
    loaded: bool,
    applied_seq: u64,
}

impl Snapshot {
    /// Apply a fetch. Returns `false` if it was older than the last one applied.
    ///
    /// Success replaces all rows and clears the error. Failure keeps the
    /// previous rows and records only the latest error.
    pub fn apply(&mut self, fetch: Fetch) -> bool {
        if fetch.seq <= self.applied_seq {
            return false;
        }
        self.applied_seq = fetch.seq;
        self.loaded = true;
        match fetch.result {
            Ok(rows) => {
                self.rows = rows;
                self.error = None;
            }
            Err(message) => self.error = Some(message),
        }
        true
    }

    pub fn rows(&self) -> &[PatientRow] {
        &self.rows
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `true` until the first fetch has been applied.
    pub fn is_loading(&self) -> bool {
        !self.loaded
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{Gender, PatientRow};

    pub fn row(id: i64, first: &str, city: &str, state: &str, gender: Gender, registered: &str) -> PatientRow {
        PatientRow {
            id,
            first_name: first.into(),
            last_name: "Tester".into(),
            date_of_birth: "1990-01-01".into(),
            gender,
            phone: "555 000 0000".into(),
            email: None,
            street_address: "1 Test Way".into(),
            city: city.into(),
            state: state.into(),
            postal_code: "00000".into(),
            medical_record_number: format!("MRN-{id:03}"),
            allergies: None,
            pre_existing_conditions: None,
            emergency_contact_name: "Contact".into(),
            emergency_contact_phone: "555 111 1111".into(),
            registration_date: registered.into(),
            registered_by: "medblocks".into(),
        }
    }
}
