//! Searchable, filterable, sortable patient table.
//!
//! Filtering and sorting happen entirely on the loaded rows; the database is
//! never re-queried for them.

use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Fetch, Snapshot};
use crate::models::{Gender, PatientRow};

/// A patient column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Id,
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
    RegistrationDate,
    RegisteredBy,
}

impl Column {
    pub const ALL: [Column; 18] = [
        Column::Id,
        Column::FirstName,
        Column::LastName,
        Column::DateOfBirth,
        Column::Gender,
        Column::Phone,
        Column::Email,
        Column::StreetAddress,
        Column::City,
        Column::State,
        Column::PostalCode,
        Column::MedicalRecordNumber,
        Column::Allergies,
        Column::PreExistingConditions,
        Column::EmergencyContactName,
        Column::EmergencyContactPhone,
        Column::RegistrationDate,
        Column::RegisteredBy,
    ];

    /// Columns shown in the table, with header labels.
    pub const DISPLAYED: [(Column, &'static str); 8] = [
        (Column::MedicalRecordNumber, "MRN"),
        (Column::FirstName, "Name"),
        (Column::DateOfBirth, "DOB"),
        (Column::Gender, "Gender"),
        (Column::City, "City"),
        (Column::State, "State"),
        (Column::Phone, "Contact"),
        (Column::RegistrationDate, "Registration Date"),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::FirstName => "first_name",
            Column::LastName => "last_name",
            Column::DateOfBirth => "date_of_birth",
            Column::Gender => "gender",
            Column::Phone => "phone",
            Column::Email => "email",
            Column::StreetAddress => "street_address",
            Column::City => "city",
            Column::State => "state",
            Column::PostalCode => "postal_code",
            Column::MedicalRecordNumber => "medical_record_number",
            Column::Allergies => "allergies",
            Column::PreExistingConditions => "pre_existing_conditions",
            Column::EmergencyContactName => "emergency_contact_name",
            Column::EmergencyContactPhone => "emergency_contact_phone",
            Column::RegistrationDate => "registration_date",
            Column::RegisteredBy => "registered_by",
        }
    }

    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

/// Sort key of one cell, compared in its stored representation.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum CellKey<'a> {
    Missing,
    Number(i64),
    Text(&'a str),
}

fn cell_key(row: &PatientRow, column: Column) -> CellKey<'_> {
    match column {
        Column::Id => CellKey::Number(row.id),
        Column::FirstName => CellKey::Text(&row.first_name),
        Column::LastName => CellKey::Text(&row.last_name),
        Column::DateOfBirth => CellKey::Text(&row.date_of_birth),
        Column::Gender => CellKey::Text(row.gender.as_str()),
        Column::Phone => CellKey::Text(&row.phone),
        Column::Email => optional(&row.email),
        Column::StreetAddress => CellKey::Text(&row.street_address),
        Column::City => CellKey::Text(&row.city),
        Column::State => CellKey::Text(&row.state),
        Column::PostalCode => CellKey::Text(&row.postal_code),
        Column::MedicalRecordNumber => CellKey::Text(&row.medical_record_number),
        Column::Allergies => optional(&row.allergies),
        Column::PreExistingConditions => optional(&row.pre_existing_conditions),
        Column::EmergencyContactName => CellKey::Text(&row.emergency_contact_name),
        Column::EmergencyContactPhone => CellKey::Text(&row.emergency_contact_phone),
        Column::RegistrationDate => CellKey::Text(&row.registration_date),
        Column::RegisteredBy => CellKey::Text(&row.registered_by),
    }
}

fn optional(value: &Option<String>) -> CellKey<'_> {
    match value {
        Some(s) => CellKey::Text(s),
        None => CellKey::Missing,
    }
}

/// String form of a cell, `None` when missing.
pub fn cell_text(row: &PatientRow, column: Column) -> Option<Cow<'_, str>> {
    match cell_key(row, column) {
        CellKey::Missing => None,
        CellKey::Number(n) => Some(Cow::Owned(n.to_string())),
        CellKey::Text(s) => Some(Cow::Borrowed(s)),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortConfig {
    pub column: Column,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            column: Column::RegistrationDate,
            direction: SortDirection::Desc,
        }
    }
}

impl SortConfig {
    /// Header click: same column ascending flips to descending, anything
    /// else sorts the clicked column ascending.
    pub fn toggled(self, column: Column) -> SortConfig {
        let direction = if self.column == column && self.direction == SortDirection::Asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        SortConfig { column, direction }
    }
}

/// Equality filters. `None` means "all".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableFilters {
    pub gender: Option<Gender>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl TableFilters {
    fn matches(&self, row: &PatientRow) -> bool {
        self.gender.map_or(true, |g| row.gender == g)
            && self.city.as_deref().map_or(true, |c| row.city == c)
            && self.state.as_deref().map_or(true, |s| row.state == s)
    }
}

/// Choices offered by the city and state filters.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FilterOptions {
    pub cities: Vec<String>,
    pub states: Vec<String>,
}

/// Distinct non-empty cities and states, sorted.
pub fn filter_options(rows: &[PatientRow]) -> FilterOptions {
    let mut cities = BTreeSet::new();
    let mut states = BTreeSet::new();
    for row in rows {
        if !row.city.is_empty() {
            cities.insert(row.city.clone());
        }
        if !row.state.is_empty() {
            states.insert(row.state.clone());
        }
    }
    FilterOptions {
        cities: cities.into_iter().collect(),
        states: states.into_iter().collect(),
    }
}

fn matches_search(row: &PatientRow, needle: &str) -> bool {
    needle.is_empty()
        || Column::ALL.iter().any(|&column| {
            cell_text(row, column)
                .map(|value| value.to_lowercase().contains(needle))
                .unwrap_or(false)
        })
}

/// Rows passing search and filters, in sort order.
///
/// Search is a case-insensitive substring match over every column. The sort
/// is stable, so ties keep their loaded order.
pub fn filter_and_sort(
    rows: &[PatientRow],
    search: &str,
    filters: &TableFilters,
    sort: SortConfig,
) -> Vec<PatientRow> {
    let needle = search.to_lowercase();
    let mut visible: Vec<PatientRow> = rows
        .iter()
        .filter(|row| matches_search(row, &needle) && filters.matches(row))
        .cloned()
        .collect();

    visible.sort_by(|a, b| {
        let ordering = cell_key(a, sort.column).cmp(&cell_key(b, sort.column));
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    visible
}

/// Table view state: loaded rows plus the user's search, filters and sort.
#[derive(Debug, Clone, Default)]
pub struct PatientTableView {
    snapshot: Snapshot,
    search: String,
    filters: TableFilters,
    sort: SortConfig,
}

impl PatientTableView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, fetch: Fetch) -> bool {
        self.snapshot.apply(fetch)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_filters(&mut self, filters: TableFilters) {
        self.filters = filters;
    }

    pub fn filters(&self) -> &TableFilters {
        &self.filters
    }

    pub fn toggle_sort(&mut self, column: Column) -> SortConfig {
        self.sort = self.sort.toggled(column);
        self.sort
    }

    pub fn sort(&self) -> SortConfig {
        self.sort
    }

    /// Options derived from the rows currently loaded.
    pub fn filter_options(&self) -> FilterOptions {
        filter_options(self.snapshot.rows())
    }

    pub fn visible(&self) -> Vec<PatientRow> {
        filter_and_sort(self.snapshot.rows(), &self.search, &self.filters, self.sort)
    }

    /// (shown, total) for "Showing N of M patients".
    pub fn counts(&self) -> (usize, usize) {
        (self.visible().len(), self.snapshot.rows().len())
    }
}
