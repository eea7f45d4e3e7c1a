//! Patient Registry Core Library
//!
//! Local-first patient registration and lookup over an embedded SQLite database.
//!
//! # Architecture
//!
//! ```text
//!   Registration Wizard            Query Console
//!   (6 validated steps)         (unrestricted SQL)
//!           │                           │
//!      insert_patient              execute_raw
//!           │                           │
//!           └────────────┬──────────────┘
//!                        ▼
//!              ┌───────────────────┐
//!              │  patients (SQLite)│
//!              └─────────┬─────────┘
//!                        │ list_patients (polled)
//!              ┌─────────┴─────────┐
//!              ▼                   ▼
//!         List View           Table View
//!                       (search / filter / sort)
//! ```
//!
//! # Core Principle
//!
//! **Patients are append-only.** No update or delete path exists outside the console.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (Patient, NewPatient, PatientRow) and date normalization
//! - [`wizard`]: Registration state machine and field validators
//! - [`views`]: List/table views and the background poller
//! - [`console`]: Ad-hoc query results
//! - [`config`]: Startup configuration
//! - [`logging`]: Tracing subscriber setup

pub mod config;
pub mod console;
pub mod db;
pub mod logging;
pub mod models;
pub mod views;
pub mod wizard;

// Re-export commonly used types
pub use config::RegistryConfig;
pub use console::{QueryResult, ResultTable};
pub use db::{Database, DbError};
pub use logging::init_logging;
pub use models::{Gender, NewPatient, Patient, PatientRow};
pub use views::{Column, Fetch, PatientListView, PatientTableView, Poller, SortConfig, TableFilters};
pub use wizard::{Field, FieldErrors, RegistrationForm, Step, Wizard, WizardError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum RegistryError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to initialize database: {0}")]
    Initialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<DbError> for RegistryError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Constraint(msg) => RegistryError::ConstraintViolation(msg),
            other => RegistryError::Storage(other.to_string()),
        }
    }
}

impl From<WizardError> for RegistryError {
    fn from(e: WizardError) -> Self {
        match e {
            WizardError::Validation(errors) => RegistryError::Validation(describe(&errors)),
            WizardError::Storage(db) => db.into(),
            other => RegistryError::InvalidInput(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for RegistryError {
    fn from(e: config::ConfigError) -> Self {
        RegistryError::Initialization(e.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::Storage(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for RegistryError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        RegistryError::Storage(format!("Lock poisoned: {}", e))
    }
}

fn describe(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn to_field_map(errors: &FieldErrors) -> HashMap<String, String> {
    errors
        .iter()
        .map(|(field, message)| (field.to_string(), message.clone()))
        .collect()
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open the registry described by a JSON config (see [`RegistryConfig`]).
#[uniffi::export]
pub fn open_registry(config_json: String) -> Result<Arc<PatientRegistry>, RegistryError> {
    let config = RegistryConfig::from_json_str(&config_json)?;
    PatientRegistry::open(config).map(Arc::new)
}

/// Open or create a registry database at the given path.
#[uniffi::export]
pub fn open_registry_at(path: String) -> Result<Arc<PatientRegistry>, RegistryError> {
    PatientRegistry::open(RegistryConfig::at_path(path)).map(Arc::new)
}

/// Create an in-memory registry (for testing).
#[uniffi::export]
pub fn open_registry_in_memory() -> Result<Arc<PatientRegistry>, RegistryError> {
    PatientRegistry::open(RegistryConfig::in_memory()).map(Arc::new)
}

/// Install the default log subscriber. Safe to call more than once.
#[uniffi::export]
pub fn install_logging() -> bool {
    init_logging()
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe registry handle for FFI hosts.
///
/// Every call serializes through one database mutex.
#[derive(uniffi::Object)]
pub struct PatientRegistry {
    db: Arc<Mutex<Database>>,
    config: RegistryConfig,
    wizard: Mutex<Wizard>,
    list: Arc<Mutex<PatientListView>>,
    table: Arc<Mutex<PatientTableView>>,
    poller: Mutex<Option<Poller>>,
}

impl PatientRegistry {
    /// Open the database. Any failure here is fatal for the host.
    pub fn open(config: RegistryConfig) -> Result<Self, RegistryError> {
        let db = Database::open_with_config(&config)
            .map_err(|e| RegistryError::Initialization(e.to_string()))?;
        info!(registered_by = %config.registered_by, "patient registry ready");
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            wizard: Mutex::new(Wizard::new(config.registered_by.clone())),
            config,
            list: Arc::new(Mutex::new(PatientListView::new())),
            table: Arc::new(Mutex::new(PatientTableView::new())),
            poller: Mutex::new(None),
        })
    }

    fn refresh_views(&self) -> Result<(), RegistryError> {
        let db = self.db.lock()?;
        let fetch = Fetch::run(&db);
        drop(db);
        self.list.lock()?.apply(fetch.clone());
        self.table.lock()?.apply(fetch);
        Ok(())
    }
}

#[uniffi::export]
impl PatientRegistry {
    // =========================================================================
    // Data Access
    // =========================================================================

    /// Validate and insert a complete registration in one call.
    pub fn register_patient(&self, form: FfiRegistrationForm) -> Result<i64, RegistryError> {
        let form: RegistrationForm = form.into();
        let patient = NewPatient::from_form(&form, &self.config.registered_by)
            .map_err(|errors| RegistryError::Validation(describe(&errors)))?;
        let db = self.db.lock()?;
        Ok(db.insert_patient(&patient)?)
    }

    /// All patients, most recently registered first, dates normalized.
    pub fn list_patients(&self) -> Result<Vec<FfiPatientRow>, RegistryError> {
        let db = self.db.lock()?;
        let patients = db.list_patients()?;
        Ok(patients.iter().map(|p| PatientRow::from(p).into()).collect())
    }

    /// Run one console statement, unrestricted.
    pub fn execute_sql(&self, sql: String) -> Result<FfiQueryResult, RegistryError> {
        let db = self.db.lock()?;
        let result = db.execute_raw(&sql)?;
        FfiQueryResult::try_from(result)
    }

    /// Drop and recreate the patients table. Destroys every stored patient.
    pub fn reset_database(&self) -> Result<(), RegistryError> {
        let db = self.db.lock()?;
        db.reset()?;
        Ok(())
    }

    // =========================================================================
    // Wizard Operations
    // =========================================================================

    pub fn wizard_state(&self) -> Result<FfiWizardState, RegistryError> {
        let wizard = self.wizard.lock()?;
        Ok(FfiWizardState::from(&*wizard))
    }

    pub fn wizard_set_field(&self, field: String, value: String) -> Result<(), RegistryError> {
        let field: Field = field
            .parse()
            .map_err(|e: wizard::ParseFieldError| RegistryError::InvalidInput(e.to_string()))?;
        self.wizard.lock()?.set_field(field, value);
        Ok(())
    }

    /// Advance one step. Returns the new step number.
    pub fn wizard_next(&self) -> Result<u8, RegistryError> {
        Ok(self.wizard.lock()?.next()?.number())
    }

    /// Go back one step. Returns the new step number.
    pub fn wizard_previous(&self) -> Result<u8, RegistryError> {
        Ok(self.wizard.lock()?.previous()?.number())
    }

    /// Jump to a step (1-6). Returns the new step number.
    pub fn wizard_go_to(&self, step: u8) -> Result<u8, RegistryError> {
        let target = Step::from_number(step)
            .ok_or_else(|| RegistryError::InvalidInput(format!("no such step: {}", step)))?;
        Ok(self.wizard.lock()?.go_to(target)?.number())
    }

    /// Submit from the review step. Returns the new patient id.
    pub fn wizard_submit(&self) -> Result<i64, RegistryError> {
        let mut wizard = self.wizard.lock()?;
        let db = self.db.lock()?;
        Ok(wizard.submit(&db)?)
    }

    // =========================================================================
    // View Operations
    // =========================================================================

    /// Reload both views now.
    pub fn refresh(&self) -> Result<(), RegistryError> {
        self.refresh_views()
    }

    /// Start reloading both views every `poll_interval_ms`. No-op if running.
    pub fn start_polling(&self) -> Result<(), RegistryError> {
        let mut poller = self.poller.lock()?;
        if poller.is_some() {
            return Ok(());
        }
        let list = Arc::clone(&self.list);
        let table = Arc::clone(&self.table);
        let handle = Poller::spawn(Arc::clone(&self.db), self.config.poll_interval(), move |fetch| {
            if let Ok(mut list) = list.lock() {
                list.apply(fetch.clone());
            }
            if let Ok(mut table) = table.lock() {
                table.apply(fetch);
            }
        })
        .map_err(|e| RegistryError::Storage(e.to_string()))?;
        *poller = Some(handle);
        Ok(())
    }

    /// Stop polling (view teardown).
    pub fn stop_polling(&self) -> Result<(), RegistryError> {
        if let Some(poller) = self.poller.lock()?.take() {
            poller.stop();
        }
        Ok(())
    }

    pub fn list_view(&self) -> Result<FfiListState, RegistryError> {
        let view = self.list.lock()?;
        Ok(FfiListState {
            loading: view.snapshot().is_loading(),
            error: view.snapshot().error().map(str::to_string),
            entries: view.entries().into_iter().map(Into::into).collect(),
        })
    }

    pub fn table_set_search(&self, term: String) -> Result<(), RegistryError> {
        self.table.lock()?.set_search(term);
        Ok(())
    }

    /// Set equality filters. Empty or missing values mean "all".
    pub fn table_set_filters(
        &self,
        gender: Option<String>,
        city: Option<String>,
        state: Option<String>,
    ) -> Result<(), RegistryError> {
        let gender = match non_empty(gender) {
            Some(g) => Some(
                g.parse::<Gender>()
                    .map_err(|e| RegistryError::InvalidInput(e.to_string()))?,
            ),
            None => None,
        };
        self.table.lock()?.set_filters(TableFilters {
            gender,
            city: non_empty(city),
            state: non_empty(state),
        });
        Ok(())
    }

    /// Header click on `column`. Returns true when now ascending.
    pub fn table_toggle_sort(&self, column: String) -> Result<bool, RegistryError> {
        let column = Column::from_name(&column)
            .ok_or_else(|| RegistryError::InvalidInput(format!("unknown column: {}", column)))?;
        let sort = self.table.lock()?.toggle_sort(column);
        Ok(sort.direction == views::SortDirection::Asc)
    }

    pub fn table_view(&self) -> Result<FfiTableState, RegistryError> {
        let view = self.table.lock()?;
        let rows = view.visible();
        let options = view.filter_options();
        Ok(FfiTableState {
            loading: view.snapshot().is_loading(),
            error: view.snapshot().error().map(str::to_string),
            total: view.snapshot().rows().len() as u32,
            shown: rows.len() as u32,
            rows: rows.into_iter().map(Into::into).collect(),
            cities: options.cities,
            states: options.states,
            sort_column: view.sort().column.as_str().to_string(),
            sort_ascending: view.sort().direction == views::SortDirection::Asc,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe registration form. Empty strings mean "not entered".
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiRegistrationForm {
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

impl From<FfiRegistrationForm> for RegistrationForm {
    fn from(f: FfiRegistrationForm) -> Self {
        RegistrationForm {
            first_name: f.first_name,
            last_name: f.last_name,
            date_of_birth: f.date_of_birth,
            gender: f.gender,
            phone: f.phone,
            email: f.email,
            street_address: f.street_address,
            city: f.city,
            state: f.state,
            postal_code: f.postal_code,
            medical_record_number: f.medical_record_number,
            allergies: f.allergies,
            pre_existing_conditions: f.pre_existing_conditions,
            emergency_contact_name: f.emergency_contact_name,
            emergency_contact_phone: f.emergency_contact_phone,
        }
    }
}

impl From<&RegistrationForm> for FfiRegistrationForm {
    fn from(f: &RegistrationForm) -> Self {
        Self {
            first_name: f.first_name.clone(),
            last_name: f.last_name.clone(),
            date_of_birth: f.date_of_birth.clone(),
            gender: f.gender.clone(),
            phone: f.phone.clone(),
            email: f.email.clone(),
            street_address: f.street_address.clone(),
            city: f.city.clone(),
            state: f.state.clone(),
            postal_code: f.postal_code.clone(),
            medical_record_number: f.medical_record_number.clone(),
            allergies: f.allergies.clone(),
            pre_existing_conditions: f.pre_existing_conditions.clone(),
            emergency_contact_name: f.emergency_contact_name.clone(),
            emergency_contact_phone: f.emergency_contact_phone.clone(),
        }
    }
}

/// FFI-safe wizard snapshot.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiWizardState {
    pub current_step: u8,
    pub step_title: String,
    /// Completion per step 1-6, for the step indicator
    pub steps_complete: Vec<bool>,
    pub errors: HashMap<String, String>,
    pub form: FfiRegistrationForm,
}

impl From<&Wizard> for FfiWizardState {
    fn from(wizard: &Wizard) -> Self {
        Self {
            current_step: wizard.current_step().number(),
            step_title: wizard.current_step().title().to_string(),
            steps_complete: Step::ALL
                .iter()
                .map(|&step| wizard.is_step_complete(step))
                .collect(),
            errors: to_field_map(wizard.errors()),
            form: wizard.form().into(),
        }
    }
}

/// FFI-safe patient row (dates normalized).
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
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
    pub registration_date: String,
    pub registered_by: String,
}

impl From<PatientRow> for FfiPatientRow {
    fn from(row: PatientRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            gender: row.gender.to_string(),
            phone: row.phone,
            email: row.email,
            street_address: row.street_address,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            medical_record_number: row.medical_record_number,
            allergies: row.allergies,
            pre_existing_conditions: row.pre_existing_conditions,
            emergency_contact_name: row.emergency_contact_name,
            emergency_contact_phone: row.emergency_contact_phone,
            registration_date: row.registration_date,
            registered_by: row.registered_by,
        }
    }
}

/// FFI-safe list entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiListEntry {
    pub id: i64,
    pub medical_record_number: String,
    pub name: String,
    pub location: String,
    pub date_of_birth: String,
    pub phone: String,
    pub email: String,
    pub registration_date: String,
}

impl From<views::ListEntry> for FfiListEntry {
    fn from(e: views::ListEntry) -> Self {
        Self {
            id: e.id,
            medical_record_number: e.medical_record_number,
            name: e.name,
            location: e.location,
            date_of_birth: e.date_of_birth,
            phone: e.phone,
            email: e.email,
            registration_date: e.registration_date,
        }
    }
}

/// FFI-safe list view state.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiListState {
    pub loading: bool,
    pub error: Option<String>,
    pub entries: Vec<FfiListEntry>,
}

/// FFI-safe table view state.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTableState {
    pub loading: bool,
    pub error: Option<String>,
    pub rows: Vec<FfiPatientRow>,
    pub shown: u32,
    pub total: u32,
    pub cities: Vec<String>,
    pub states: Vec<String>,
    pub sort_column: String,
    pub sort_ascending: bool,
}

/// FFI-safe console result: pretty JSON plus an optional generic table.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiQueryResult {
    pub json: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub affected_rows: u64,
}

impl TryFrom<QueryResult> for FfiQueryResult {
    type Error = RegistryError;

    fn try_from(result: QueryResult) -> Result<Self, Self::Error> {
        let json = result.to_json()?;
        let table = result.to_table();
        Ok(Self {
            json,
            columns: table.as_ref().map(|t| t.columns.clone()).unwrap_or_default(),
            rows: table.map(|t| t.rows).unwrap_or_default(),
            affected_rows: result.affected_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(mrn: &str) -> FfiRegistrationForm {
        FfiRegistrationForm {
            first_name: "Lin".into(),
            last_name: "Chen".into(),
            date_of_birth: "1992-06-15".into(),
            gender: "Female".into(),
            phone: "+86 10-1234-5678".into(),
            street_address: "8 Garden Rd".into(),
            city: "Beijing".into(),
            state: "BJ".into(),
            postal_code: "100000".into(),
            medical_record_number: mrn.into(),
            emergency_contact_name: "Wei Chen".into(),
            emergency_contact_phone: "+86 10-8765-4321".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_register_and_list() {
        let registry = PatientRegistry::open(RegistryConfig::in_memory()).unwrap();
        let id = registry.register_patient(form("MRN-9")).unwrap();

        let rows = registry.list_patients().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].registered_by, "medblocks");
        assert_eq!(rows[0].email, None);
    }

    #[test]
    fn test_error_kinds() {
        let registry = PatientRegistry::open(RegistryConfig::in_memory()).unwrap();
        registry.register_patient(form("MRN-9")).unwrap();

        assert!(matches!(
            registry.register_patient(form("MRN-9")),
            Err(RegistryError::ConstraintViolation(_))
        ));
        assert!(matches!(
            registry.register_patient(FfiRegistrationForm::default()),
            Err(RegistryError::Validation(_))
        ));
        assert!(matches!(
            registry.execute_sql("SELECT * FROM nowhere".into()),
            Err(RegistryError::Storage(_))
        ));
    }

    #[test]
    fn test_unopenable_database_is_initialization_error() {
        let result = PatientRegistry::open(RegistryConfig::at_path("/nonexistent/dir/patients.db"));
        assert!(matches!(result, Err(RegistryError::Initialization(_))));
    }

    #[test]
    fn test_wizard_over_ffi() {
        let registry = PatientRegistry::open(RegistryConfig::in_memory()).unwrap();

        assert!(matches!(registry.wizard_next(), Err(RegistryError::Validation(_))));
        let state = registry.wizard_state().unwrap();
        assert_eq!(state.current_step, 1);
        assert!(state.errors.contains_key("first_name"));
        assert_eq!(state.steps_complete.len(), 6);
        assert!(state.steps_complete[5]);

        assert!(matches!(
            registry.wizard_set_field("ssn".into(), "x".into()),
            Err(RegistryError::InvalidInput(_))
        ));
        assert!(matches!(registry.wizard_go_to(9), Err(RegistryError::InvalidInput(_))));
    }

    #[test]
    fn test_table_over_ffi() {
        let registry = PatientRegistry::open(RegistryConfig::in_memory()).unwrap();
        registry.register_patient(form("MRN-1")).unwrap();
        registry.refresh().unwrap();

        registry
            .table_set_filters(Some("Female".into()), Some(String::new()), None)
            .unwrap();
        let state = registry.table_view().unwrap();
        assert_eq!((state.shown, state.total), (1, 1));
        assert_eq!(state.cities, vec!["Beijing"]);
        assert_eq!(state.sort_column, "registration_date");
        assert!(!state.sort_ascending);

        assert!(registry.table_toggle_sort("first_name".into()).unwrap());
        assert!(!registry.table_toggle_sort("first_name".into()).unwrap());
        assert!(registry.table_set_filters(Some("martian".into()), None, None).is_err());
    }

    #[test]
    fn test_console_over_ffi() {
        let registry = PatientRegistry::open(RegistryConfig::in_memory()).unwrap();
        registry.register_patient(form("MRN-1")).unwrap();

        let result = registry
            .execute_sql("SELECT medical_record_number, date_of_birth FROM patients".into())
            .unwrap();
        assert_eq!(result.columns, vec!["medical_record_number", "date_of_birth"]);
        assert_eq!(result.rows, vec![vec!["MRN-1".to_string(), "1992-06-15".to_string()]]);
        assert!(result.json.contains("MRN-1"));
    }

    #[test]
    fn test_polling_start_stop() {
        let registry = PatientRegistry::open(RegistryConfig {
            poll_interval_ms: 10,
            ..RegistryConfig::in_memory()
        })
        .unwrap();
        registry.start_polling().unwrap();
        registry.start_polling().unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while registry.list_view().unwrap().loading && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(!registry.list_view().unwrap().loading);
        registry.stop_polling().unwrap();
    }

    fn wait_for_entries(registry: &PatientRegistry, expected: usize) -> usize {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            let count = registry.list_view().unwrap().entries.len();
            if count == expected || std::time::Instant::now() >= deadline {
                return count;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
    }

    #[test]
    fn test_polling_picks_up_reset() {
        let registry = PatientRegistry::open(RegistryConfig {
            poll_interval_ms: 10,
            ..RegistryConfig::in_memory()
        })
        .unwrap();
        registry.start_polling().unwrap();

        registry.register_patient(form("MRN-1")).unwrap();
        assert_eq!(wait_for_entries(&registry, 1), 1);

        registry.reset_database().unwrap();
        assert_eq!(wait_for_entries(&registry, 0), 0);
        registry.stop_polling().unwrap();
    }

    #[test]
    fn test_console_rejects_multiple_statements() {
        let registry = PatientRegistry::open(RegistryConfig::in_memory()).unwrap();
        assert!(matches!(
            registry.execute_sql("SELECT 1; SELECT 2".into()),
            Err(RegistryError::Storage(_))
        ));
    }
}
