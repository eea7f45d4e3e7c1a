//! SQLite schema definition.

/// Patient registry schema. Safe to apply on every open.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patients (Append-Only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,         -- AUTOINCREMENT: ids are never reused
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    date_of_birth DATE NOT NULL,                  -- YYYY-MM-DD
    gender TEXT NOT NULL
        CHECK (gender IN ('Male', 'Female', 'Non-binary', 'Other')),
    phone TEXT NOT NULL,
    email TEXT,
    street_address TEXT NOT NULL,
    city TEXT NOT NULL,
    state TEXT NOT NULL,
    postal_code TEXT NOT NULL,
    medical_record_number TEXT UNIQUE NOT NULL,
    allergies TEXT,
    pre_existing_conditions TEXT,
    emergency_contact_name TEXT NOT NULL,
    emergency_contact_phone TEXT NOT NULL,
    registration_date TIMESTAMP NOT NULL
        DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    registered_by TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_registration_date ON patients(registration_date);
CREATE INDEX IF NOT EXISTS idx_patients_city ON patients(city);
CREATE INDEX IF NOT EXISTS idx_patients_state ON patients(state);
"#;

/// Destroys all stored patients. Only run through [`super::Database::reset`].
pub const DROP_SCHEMA: &str = r#"
DROP INDEX IF EXISTS idx_patients_registration_date;
DROP INDEX IF EXISTS idx_patients_city;
DROP INDEX IF EXISTS idx_patients_state;
DROP TABLE IF EXISTS patients;
"#;
