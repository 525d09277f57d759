//! Database migration system for fuelledger.
//!
//! This module handles database schema versioning and migrations,
//! ensuring the database schema stays up-to-date as the application evolves.

use rusqlite::{params, Connection};
use tracing::{info, warn};

use crate::error::{Error, Result};

use super::schema::{CREATE_SESSIONS_TABLE, CREATE_SESSION_ACCOUNT_INDEX, SCHEMA_STATEMENTS};

/// The current schema version.
pub const CURRENT_VERSION: i32 = 3;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Initialize the database schema.
///
/// Creates all tables and indexes if they don't exist, then runs any
/// pending migrations to bring the schema up to the current version.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version < CURRENT_VERSION {
        run_migrations(conn, version)?;
    } else if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
pub(crate) fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < CURRENT_VERSION {
        current += 1;
        run_migration(conn, current)?;
    }

    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        3 => migrate_v3(conn),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Migration to version 1 (initial schema).
///
/// Version 1 is the base schema created by `SCHEMA_STATEMENTS`.
fn migrate_v1(conn: &Connection) -> Result<()> {
    set_schema_version(conn, 1)?;
    Ok(())
}

/// Migration to version 2: direct account to driver link.
///
/// Adds `accounts.driver_id` and backfills it for existing driver accounts
/// by matching the first token of the display name against driver first
/// names. Only unambiguous matches are linked; the rest keep a `NULL` link
/// and are reported.
fn migrate_v2(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        r"
        ALTER TABLE accounts ADD COLUMN driver_id INTEGER REFERENCES drivers(id);
        CREATE INDEX IF NOT EXISTS idx_accounts_driver ON accounts(driver_id);
        ",
    )?;

    let legacy: Vec<(i64, String, String)> = {
        let mut stmt = tx.prepare(
            "SELECT id, username, display_name FROM accounts WHERE role = 'driver' AND driver_id IS NULL",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };

    let mut linked = 0_usize;
    for (account_id, username, display_name) in legacy {
        let Some(first_token) = display_name.split_whitespace().next() else {
            warn!(%username, "Driver account has an empty display name, left unlinked");
            continue;
        };

        let candidates: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT id FROM drivers WHERE first_name = ?1 ORDER BY id")?;
            let ids = stmt
                .query_map([first_token], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            ids
        };

        match candidates.as_slice() {
            [driver_id] => {
                tx.execute(
                    "UPDATE accounts SET driver_id = ?1 WHERE id = ?2",
                    params![driver_id, account_id],
                )?;
                linked += 1;
            }
            [] => warn!(%username, name = first_token, "No driver matches account, left unlinked"),
            _ => warn!(
                %username,
                name = first_token,
                candidates = candidates.len(),
                "Several drivers match account, left unlinked"
            ),
        }
    }

    set_schema_version(&tx, 2)?;
    tx.commit()?;

    if linked > 0 {
        info!("Linked {} driver accounts to drivers", linked);
    }
    Ok(())
}

/// Migration to version 3: server-side login sessions.
fn migrate_v3(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(CREATE_SESSIONS_TABLE, [])?;
    tx.execute(CREATE_SESSION_ACCOUNT_INDEX, [])?;
    set_schema_version(&tx, 3)?;
    tx.commit()?;
    Ok(())
}
