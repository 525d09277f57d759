//! Storage layer for fuelledger.
//!
//! This module provides `SQLite`-based persistent storage for the vehicle and
//! driver directories, the append-only fuel-load ledger and user accounts.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::{Account, NewAccount};
use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::model::{
    Driver, FuelLoadRecord, NewDriver, NewFuelLoad, NewVehicle, Role, Vehicle, VehicleCategory,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

const VEHICLE_COLUMNS: &str = "id, plate, make, model, category, tank_capacity, active";
const DRIVER_COLUMNS: &str = "id, first_name, last_name, national_id, license_class, active";
const FUEL_LOAD_COLUMNS: &str = "id, vehicle_id, driver_id, liters, odometer_start, odometer_end, \
     load_date, load_time, station, price, notes, recorded_by, created_at";
const ACCOUNT_COLUMNS: &str =
    "id, username, password_hash, role, display_name, driver_id, created_at";

/// Storage engine for the fleet ledger.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Vehicle and driver directories with unique natural keys
/// - Append-only fuel loads with fingerprint deduplication
/// - Accounts with hashed passwords
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // === Vehicles ===

    /// Insert a vehicle and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the plate is already registered, or a
    /// database error.
    pub fn insert_vehicle(&self, vehicle: &NewVehicle) -> Result<i64> {
        if self.exists("SELECT COUNT(*) FROM vehicles WHERE plate = ?1", &vehicle.plate)? {
            return Err(Error::conflict(format!(
                "plate '{}' is already registered",
                vehicle.plate
            )));
        }

        self.conn.execute(
            r"
            INSERT INTO vehicles (plate, make, model, category, tank_capacity, active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                vehicle.plate,
                vehicle.make,
                vehicle.model,
                vehicle.category.as_str(),
                vehicle.tank_capacity,
                vehicle.active,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted vehicle with id {}", id);
        Ok(id)
    }

    /// All vehicles ordered by plate.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn vehicles(&self) -> Result<Vec<Vehicle>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {VEHICLE_COLUMNS} FROM vehicles ORDER BY plate"))?;
        let vehicles = stmt
            .query_map([], Self::row_to_vehicle)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(vehicles)
    }

    /// Get a vehicle by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn vehicle(&self, id: i64) -> Result<Option<Vehicle>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ?1"),
                [id],
                Self::row_to_vehicle,
            )
            .optional()?;
        Ok(result)
    }

    // === Drivers ===

    /// Insert a driver and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the national id is already registered,
    /// or a database error.
    pub fn insert_driver(&self, driver: &NewDriver) -> Result<i64> {
        if self.exists(
            "SELECT COUNT(*) FROM drivers WHERE national_id = ?1",
            &driver.national_id,
        )? {
            return Err(Error::conflict(format!(
                "national id '{}' is already registered",
                driver.national_id
            )));
        }

        self.conn.execute(
            r"
            INSERT INTO drivers (first_name, last_name, national_id, license_class, active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                driver.first_name,
                driver.last_name,
                driver.national_id,
                driver.license_class,
                driver.active,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted driver with id {}", id);
        Ok(id)
    }

    /// All drivers in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn drivers(&self) -> Result<Vec<Driver>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {DRIVER_COLUMNS} FROM drivers ORDER BY id"))?;
        let drivers = stmt
            .query_map([], Self::row_to_driver)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(drivers)
    }

    /// Get a driver by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn driver(&self, id: i64) -> Result<Option<Driver>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE id = ?1"),
                [id],
                Self::row_to_driver,
            )
            .optional()?;
        Ok(result)
    }

    // === Fuel loads ===

    /// Append a fuel load to the ledger.
    ///
    /// Returns the assigned id, or `None` if a load with the same fingerprint
    /// is already recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn append_fuel_load(&self, load: &NewFuelLoad) -> Result<Option<i64>> {
        if self.exists(
            "SELECT COUNT(*) FROM fuel_loads WHERE fingerprint = ?1",
            &load.fingerprint,
        )? {
            debug!(
                "Skipping duplicate fuel load with fingerprint {}",
                load.fingerprint.get(..16).unwrap_or(&load.fingerprint)
            );
            return Ok(None);
        }

        self.conn.execute(
            r"
            INSERT INTO fuel_loads (
                vehicle_id, driver_id, liters, odometer_start, odometer_end,
                load_date, load_time, station, price, notes,
                recorded_by, created_at, fingerprint
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ",
            params![
                load.vehicle_id,
                load.driver_id,
                load.liters,
                load.odometer_start,
                load.odometer_end,
                load.date.format(DATE_FORMAT).to_string(),
                load.time.format(TIME_FORMAT).to_string(),
                load.station,
                load.price,
                load.notes,
                load.recorded_by,
                load.created_at.to_rfc3339(),
                load.fingerprint,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted fuel load with id {}", id);
        Ok(Some(id))
    }

    /// The whole ledger in chronological order (date, time, then id).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn fuel_loads(&self) -> Result<Vec<FuelLoadRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FUEL_LOAD_COLUMNS} FROM fuel_loads ORDER BY load_date, load_time, id"
        ))?;
        let loads = stmt
            .query_map([], Self::row_to_fuel_load)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(loads)
    }

    /// The most recent fuel loads, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent_fuel_loads(&self, limit: usize) -> Result<Vec<FuelLoadRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FUEL_LOAD_COLUMNS} FROM fuel_loads \
             ORDER BY load_date DESC, load_time DESC, id DESC LIMIT ?1"
        ))?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let loads = stmt
            .query_map([limit_i64], Self::row_to_fuel_load)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(loads)
    }

    /// Get a fuel load by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn fuel_load(&self, id: i64) -> Result<Option<FuelLoadRecord>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {FUEL_LOAD_COLUMNS} FROM fuel_loads WHERE id = ?1"),
                [id],
                Self::row_to_fuel_load,
            )
            .optional()?;
        Ok(result)
    }

    // === Accounts ===

    /// Insert an account with an already computed password hash.
    ///
    /// The plain-text `password` field of `account` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the username is taken, or a database
    /// error.
    pub fn insert_account(&self, account: &NewAccount, password_hash: &str) -> Result<i64> {
        if self.exists(
            "SELECT COUNT(*) FROM accounts WHERE username = ?1",
            &account.username,
        )? {
            return Err(Error::conflict(format!(
                "username '{}' is already registered",
                account.username
            )));
        }

        self.conn.execute(
            r"
            INSERT INTO accounts (username, password_hash, role, display_name, driver_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                account.username,
                password_hash,
                account.role.as_str(),
                account.display_name,
                account.driver_id,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted account with id {}", id);
        Ok(id)
    }

    /// Look up an account by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1"),
                [username],
                Self::row_to_account,
            )
            .optional()?;
        Ok(result)
    }

    /// All accounts ordered by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn accounts(&self) -> Result<Vec<Account>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY username"))?;
        let accounts = stmt
            .query_map([], Self::row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    // === Sessions ===

    /// Record a login session by the hash of its token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_session(
        &self,
        token_hash: &str,
        account_id: i64,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (token_hash, account_id, issued_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                token_hash,
                account_id,
                session_timestamp(issued_at),
                session_timestamp(expires_at),
            ],
        )?;
        debug!("Inserted session for account {}", account_id);
        Ok(())
    }

    /// Look up a session by token hash, joined with its account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a stored
    /// timestamp cannot be parsed.
    pub fn session_by_token_hash(&self, token_hash: &str) -> Result<Option<StoredSession>> {
        let result = self
            .conn
            .query_row(
                r"
                SELECT a.id, a.username, a.password_hash, a.role, a.display_name,
                       a.driver_id, a.created_at, s.issued_at, s.expires_at
                FROM sessions s JOIN accounts a ON a.id = s.account_id
                WHERE s.token_hash = ?1
                ",
                [token_hash],
                |row| {
                    let issued_at: String = row.get(7)?;
                    let expires_at: String = row.get(8)?;
                    Ok(StoredSession {
                        account: Self::row_to_account(row)?,
                        issued_at: parse_stored_timestamp(7, &issued_at)?,
                        expires_at: parse_stored_timestamp(8, &expires_at)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    /// Delete a session. Returns whether a session was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_session(&self, token_hash: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?;
        Ok(removed > 0)
    }

    /// Delete every session expired at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM sessions WHERE expires_at <= ?1", [session_timestamp(now)])?;
        if removed > 0 {
            debug!("Purged {} expired sessions", removed);
        }
        Ok(removed)
    }

    // === Transactions ===

    /// Run `f` inside one transaction.
    ///
    /// Everything `f` writes through this storage is committed when it
    /// returns `Ok` and rolled back when it returns `Err`.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or a database error from begin or commit.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // === Snapshots and statistics ===

    /// Load the ledger together with both reference directories.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the queries fails.
    pub fn snapshot(&self) -> Result<Ledger> {
        Ok(Ledger::new(self.fuel_loads()?, self.vehicles()?, self.drivers()?))
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let (first_load, last_load): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(load_date), MAX(load_date) FROM fuel_loads",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            vehicles: self.count("vehicles")?,
            drivers: self.count("drivers")?,
            fuel_loads: self.count("fuel_loads")?,
            accounts: self.count("accounts")?,
            schema_version: migrations::get_schema_version(&self.conn)?,
            first_load: first_load.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
            last_load: last_load.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
            db_size_bytes,
        })
    }

    /// Count rows in one of the known tables.
    fn count(&self, table: &'static str) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count)
    }

    /// Run a `SELECT COUNT(*)` query with one parameter and report whether it found rows.
    fn exists(&self, sql: &str, value: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(sql, [value], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Convert a database row to a Vehicle struct.
    fn row_to_vehicle(row: &rusqlite::Row) -> rusqlite::Result<Vehicle> {
        let category_str: String = row.get(4)?;
        let category = category_str.parse().unwrap_or_else(|_| {
            warn!("Unknown vehicle category: {}, defaulting to truck", category_str);
            VehicleCategory::Truck
        });

        Ok(Vehicle {
            id: row.get(0)?,
            plate: row.get(1)?,
            make: row.get(2)?,
            model: row.get(3)?,
            category,
            tank_capacity: row.get(5)?,
            active: row.get(6)?,
        })
    }

    /// Convert a database row to a Driver struct.
    fn row_to_driver(row: &rusqlite::Row) -> rusqlite::Result<Driver> {
        Ok(Driver {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            national_id: row.get(3)?,
            license_class: row.get(4)?,
            active: row.get(5)?,
        })
    }

    /// Convert a database row to a FuelLoadRecord struct.
    fn row_to_fuel_load(row: &rusqlite::Row) -> rusqlite::Result<FuelLoadRecord> {
        let date_str: String = row.get(6)?;
        let time_str: String = row.get(7)?;
        let created_at_str: String = row.get(12)?;

        let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
        let time = NaiveTime::parse_from_str(&time_str, TIME_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
        let created_at = parse_timestamp(&created_at_str);

        Ok(FuelLoadRecord {
            id: row.get(0)?,
            vehicle_id: row.get(1)?,
            driver_id: row.get(2)?,
            liters: row.get(3)?,
            odometer_start: row.get(4)?,
            odometer_end: row.get(5)?,
            date,
            time,
            station: row.get(8)?,
            price: row.get(9)?,
            notes: row.get(10)?,
            recorded_by: row.get(11)?,
            created_at,
        })
    }

    /// Convert a database row to an Account struct.
    fn row_to_account(row: &rusqlite::Row) -> rusqlite::Result<Account> {
        let role_str: String = row.get(3)?;
        let role = role_str.parse().unwrap_or_else(|_| {
            warn!("Unknown account role: {}, defaulting to driver", role_str);
            Role::Driver
        });
        let created_at_str: String = row.get(6)?;

        Ok(Account {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            role,
            display_name: row.get(4)?,
            driver_id: row.get(5)?,
            created_at: parse_timestamp(&created_at_str),
        })
    }
}

/// Parse an RFC 3339 timestamp, falling back to `SQLite`'s `datetime('now')`
/// format and finally to the current time.
fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|naive| naive.and_utc())
        })
        .unwrap_or_else(|_| {
            warn!("Unparseable timestamp: {}, using current time", value);
            Utc::now()
        })
}

/// Fixed-width UTC form, so that SQL compares session timestamps in time order.
fn session_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Timestamps written by this crate are RFC 3339; anything else is a
/// conversion failure rather than a silent fallback.
fn parse_stored_timestamp(index: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

/// A login session as stored, with the account it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    /// The account the session authenticates.
    pub account: Account,
    /// When the session was opened.
    pub issued_at: DateTime<Utc>,
    /// When the session stops being valid.
    pub expires_at: DateTime<Utc>,
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Number of vehicles.
    pub vehicles: i64,
    /// Number of drivers.
    pub drivers: i64,
    /// Number of fuel loads.
    pub fuel_loads: i64,
    /// Number of accounts.
    pub accounts: i64,
    /// Schema version of the database.
    pub schema_version: i32,
    /// Date of the earliest fuel load.
    pub first_load: Option<NaiveDate>,
    /// Date of the latest fuel load.
    pub last_load: Option<NaiveDate>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
