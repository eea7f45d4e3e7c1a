//! Compact patient list.

use serde::Serialize;

use super::{Fetch, Snapshot};
use crate::models::{PatientRow, NOT_AVAILABLE};

/// One line of the list: the summary columns only.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListEntry {
    pub id: i64,
    pub medical_record_number: String,
    pub name: String,
    /// "City, State"
    pub location: String,
    pub date_of_birth: String,
    pub phone: String,
    pub email: String,
    pub registration_date: String,
}

impl From<&PatientRow> for ListEntry {
    fn from(row: &PatientRow) -> Self {
        Self {
            id: row.id,
            medical_record_number: row.medical_record_number.clone(),
            name: format!("{} {}", row.first_name, row.last_name),
            location: format!("{}, {}", row.city, row.state),
            date_of_birth: placeholder_if_empty(&row.date_of_birth),
            phone: row.phone.clone(),
            email: row.email.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            registration_date: placeholder_if_empty(&row.registration_date),
        }
    }
}

fn placeholder_if_empty(value: &str) -> String {
    if value.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value.to_string()
    }
}

/// Most recently registered patients first, as loaded.
#[derive(Debug, Clone, Default)]
pub struct PatientListView {
    snapshot: Snapshot,
}

impl PatientListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, fetch: Fetch) -> bool {
        self.snapshot.apply(fetch)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn entries(&self) -> Vec<ListEntry> {
        self.snapshot.rows().iter().map(ListEntry::from).collect()
    }

    /// Loaded, without error, and nothing registered yet.
    pub fn is_empty(&self) -> bool {
        !self.snapshot.is_loading() && self.snapshot.error().is_none() && self.snapshot.rows().is_empty()
    }
}
