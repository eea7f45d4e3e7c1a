//! Patient database operations.
//!
//! Patients are append-only: there is no update or delete path.

use rusqlite::{ffi, params, OptionalExtension, Row};
use tracing::{info, warn};

use super::{Database, DbError, DbResult};
use crate::models::{NewPatient, Patient};

const SELECT_PATIENT: &str = r#"
    SELECT id, first_name, last_name, date_of_birth, gender, phone, email,
           street_address, city, state, postal_code, medical_record_number,
           allergies, pre_existing_conditions, emergency_contact_name,
           emergency_contact_phone, registration_date, registered_by
    FROM patients
"#;

impl Database {
    /// Insert a new patient, returning the engine-assigned id.
    ///
    /// A duplicate medical record number fails with [`DbError::Constraint`].
    pub fn insert_patient(&self, patient: &NewPatient) -> DbResult<i64> {
        let result = self.conn.execute(
            r#"
            INSERT INTO patients (
                first_name, last_name, date_of_birth, gender, phone, email,
                street_address, city, state, postal_code, medical_record_number,
                allergies, pre_existing_conditions, emergency_contact_name,
                emergency_contact_phone, registered_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                patient.first_name,
                patient.last_name,
                patient.date_of_birth.format("%Y-%m-%d").to_string(),
                patient.gender,
                patient.phone,
                non_empty(&patient.email),
                patient.street_address,
                patient.city,
                patient.state,
                patient.postal_code,
                patient.medical_record_number,
                non_empty(&patient.allergies),
                non_empty(&patient.pre_existing_conditions),
                patient.emergency_contact_name,
                patient.emergency_contact_phone,
                patient.registered_by,
            ],
        );

        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                info!(id, mrn = %patient.medical_record_number, "registered patient");
                Ok(id)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                warn!(mrn = %patient.medical_record_number, "duplicate medical record number");
                Err(DbError::Constraint(format!(
                    "medical record number {} is already registered",
                    patient.medical_record_number
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(&format!("{SELECT_PATIENT} WHERE id = ?"), [id], row_to_patient)
            .optional()
            .map_err(Into::into)
    }

    /// Get a patient by medical record number.
    pub fn find_patient_by_mrn(&self, mrn: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("{SELECT_PATIENT} WHERE medical_record_number = ?"),
                [mrn],
                row_to_patient,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all patients, most recently registered first.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_PATIENT} ORDER BY registration_date DESC, id DESC"))?;

        let rows = stmt.query_map([], row_to_patient)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Count stored patients.
    pub fn count_patients(&self) -> DbResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn row_to_patient(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        date_of_birth: row.get(3)?,
        gender: row.get(4)?,
        phone: row.get(5)?,
        email: row.get(6)?,
        street_address: row.get(7)?,
        city: row.get(8)?,
        state: row.get(9)?,
        postal_code: row.get(10)?,
        medical_record_number: row.get(11)?,
        allergies: row.get(12)?,
        pre_existing_conditions: row.get(13)?,
        emergency_contact_name: row.get(14)?,
        emergency_contact_phone: row.get(15)?,
        registration_date: row.get(16)?,
        registered_by: row.get(17)?,
    })
}

/// Empty optional text is stored as NULL.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use chrono::NaiveDate;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn new_patient(mrn: &str) -> NewPatient {
        NewPatient {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 7, 14).unwrap(),
            gender: Gender::Female,
            phone: "+1 555-123-4567".into(),
            email: Some("jane.doe@example.com".into()),
            street_address: "42 Elm Street".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            postal_code: "62701".into(),
            medical_record_number: mrn.into(),
            allergies: None,
            pre_existing_conditions: Some("Asthma".into()),
            emergency_contact_name: "John Doe".into(),
            emergency_contact_phone: "555 987 6543".into(),
            registered_by: "medblocks".into(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let id = db.insert_patient(&new_patient("MRN-001")).unwrap();

        let retrieved = db.get_patient(id).unwrap().unwrap();
        assert_eq!(retrieved.first_name, "Jane");
        assert_eq!(retrieved.date_of_birth, "1985-07-14");
        assert_eq!(retrieved.gender, Gender::Female);
        assert_eq!(retrieved.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(retrieved.allergies, None);
        assert_eq!(retrieved.registered_by, "medblocks");
        assert!(!retrieved.registration_date.is_empty());
    }

    #[test]
    fn test_empty_optionals_stored_as_null() {
        let db = setup_db();

        let mut patient = new_patient("MRN-002");
        patient.email = Some(String::new());
        patient.allergies = Some("   ".into());
        let id = db.insert_patient(&patient).unwrap();

        let email_is_null: bool = db
            .conn()
            .query_row("SELECT email IS NULL FROM patients WHERE id = ?", [id], |row| row.get(0))
            .unwrap();
        assert!(email_is_null);

        let retrieved = db.get_patient(id).unwrap().unwrap();
        assert_eq!(retrieved.email, None);
        assert_eq!(retrieved.allergies, None);
    }

    #[test]
    fn test_duplicate_mrn_is_constraint_violation() {
        let db = setup_db();

        db.insert_patient(&new_patient("MRN-001")).unwrap();

        let mut second = new_patient("MRN-001");
        second.first_name = "Other".into();
        let err = db.insert_patient(&second).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));

        assert_eq!(db.count_patients().unwrap(), 1);
        let kept = db.find_patient_by_mrn("MRN-001").unwrap().unwrap();
        assert_eq!(kept.first_name, "Jane");
    }

    #[test]
    fn test_ids_are_not_reused() {
        let db = setup_db();

        let first = db.insert_patient(&new_patient("MRN-001")).unwrap();
        db.conn()
            .execute("DELETE FROM patients WHERE id = ?", [first])
            .unwrap();
        let second = db.insert_patient(&new_patient("MRN-002")).unwrap();

        assert!(second > first);
    }

    #[test]
    fn test_list_most_recent_first() {
        let db = setup_db();

        let a = db.insert_patient(&new_patient("MRN-A")).unwrap();
        let b = db.insert_patient(&new_patient("MRN-B")).unwrap();
        let c = db.insert_patient(&new_patient("MRN-C")).unwrap();

        // Backdate B so it is the oldest regardless of insert order
        db.conn()
            .execute(
                "UPDATE patients SET registration_date = '2000-01-01 00:00:00.000' WHERE id = ?",
                [b],
            )
            .unwrap();

        let ids: Vec<i64> = db.list_patients().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![c, a, b]);
    }

    #[test]
    fn test_find_missing_mrn() {
        let db = setup_db();
        assert!(db.find_patient_by_mrn("nope").unwrap().is_none());
        assert!(db.get_patient(99).unwrap().is_none());
    }
}
