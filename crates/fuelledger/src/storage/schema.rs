//! `SQLite` schema definitions for fuelledger.
//!
//! This module contains the SQL statements for the base (version 1) schema.
//! Later columns are added by the migrations in [`super::migrations`].

/// SQL statement to create the vehicles table.
pub const CREATE_VEHICLES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS vehicles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    plate TEXT NOT NULL UNIQUE COLLATE NOCASE,
    make TEXT NOT NULL,
    model TEXT NOT NULL,
    category TEXT NOT NULL,
    tank_capacity REAL NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
)
";

/// SQL statement to create the drivers table.
pub const CREATE_DRIVERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS drivers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    national_id TEXT NOT NULL UNIQUE,
    license_class TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
)
";

/// SQL statement to create the append-only fuel load ledger.
pub const CREATE_FUEL_LOADS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS fuel_loads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vehicle_id INTEGER NOT NULL REFERENCES vehicles(id),
    driver_id INTEGER NOT NULL REFERENCES drivers(id),
    liters REAL NOT NULL,
    odometer_start REAL NOT NULL,
    odometer_end REAL NOT NULL,
    load_date TEXT NOT NULL,
    load_time TEXT NOT NULL,
    station TEXT NOT NULL,
    price REAL NOT NULL,
    notes TEXT,
    recorded_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    fingerprint TEXT NOT NULL UNIQUE
)
";

/// SQL statement to create an index on load date and time for ledger order.
pub const CREATE_LOAD_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_fuel_loads_date ON fuel_loads(load_date, load_time)
";

/// SQL statement to create an index on `driver_id` for per-driver views.
pub const CREATE_LOAD_DRIVER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_fuel_loads_driver ON fuel_loads(driver_id)
";

/// SQL statement to create the accounts table.
///
/// The direct `driver_id` link is added by migration 2.
pub const CREATE_ACCOUNTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL,
    display_name TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the login sessions table.
///
/// Only a BLAKE3 hash of each token is kept. Created by migration 3.
pub const CREATE_SESSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    account_id INTEGER NOT NULL REFERENCES accounts(id),
    issued_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `account_id` for session lookups.
pub const CREATE_SESSION_ACCOUNT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_sessions_account ON sessions(account_id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_VEHICLES_TABLE,
    CREATE_DRIVERS_TABLE,
    CREATE_FUEL_LOADS_TABLE,
    CREATE_LOAD_DATE_INDEX,
    CREATE_LOAD_DRIVER_INDEX,
    CREATE_ACCOUNTS_TABLE,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_fuel_loads_fingerprint_is_unique() {
        assert!(CREATE_FUEL_LOADS_TABLE.contains("fingerprint TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn test_reference_tables_enforce_natural_keys() {
        assert!(CREATE_VEHICLES_TABLE.contains("plate TEXT NOT NULL UNIQUE"));
        assert!(CREATE_DRIVERS_TABLE.contains("national_id TEXT NOT NULL UNIQUE"));
        assert!(CREATE_ACCOUNTS_TABLE.contains("username TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn test_sessions_table_stores_only_token_hashes() {
        assert!(CREATE_SESSIONS_TABLE.contains("token_hash TEXT PRIMARY KEY"));
        assert!(!CREATE_SESSIONS_TABLE.contains(" token TEXT"));
        assert!(!SCHEMA_STATEMENTS.contains(&CREATE_SESSIONS_TABLE));
    }

    #[test]
    fn test_base_accounts_table_has_no_driver_link() {
        assert!(!CREATE_ACCOUNTS_TABLE.contains("driver_id"));
    }
}
