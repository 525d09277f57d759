//! Session persistence.
//!
//! The authenticated actor is held in an explicit [`Session`] value that a
//! [`SessionStore`] saves and loads. Nothing else reads session state; every
//! command that needs an actor asks [`current_session`] for it.
//!
//! A store only carries the token. Sessions live in the database under the
//! token's BLAKE3 hash, and the actor is always rebuilt from the account
//! row, so editing the stored session cannot change role, driver or expiry.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::Actor;
use crate::storage::Storage;

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Random session token.
    pub token: String,
    /// Who is logged in.
    pub actor: Actor,
    /// When the session was opened.
    pub issued_at: DateTime<Utc>,
    /// When the session stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Persistence for the current session.
pub trait SessionStore {
    /// Load the stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self) -> Result<Option<Session>>;

    /// Replace the stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn save(&self, session: &Session) -> Result<()>;

    /// Remove the stored session. Clearing an empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn clear(&self) -> Result<()>;
}

/// Session stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Create a store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(
                    "Ignoring unreadable session file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)?;
        debug!("Saved session to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed session file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session held in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RefCell<Option<Session>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.session.borrow().clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.session.borrow_mut() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.session.borrow_mut().take();
        Ok(())
    }
}

/// Hash under which a session token is stored.
#[must_use]
pub fn token_hash(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

/// The verified session at `now`, if any.
///
/// The stored token must name a live session in `storage`. The actor and
/// expiry are rebuilt from the database, so whatever else the store holds is
/// never trusted. Unknown and expired sessions are cleared and treated as
/// absent.
///
/// # Errors
///
/// Returns an error if the store or the database cannot be read or cleared.
pub fn current_session(
    store: &dyn SessionStore,
    storage: &Storage,
    now: DateTime<Utc>,
) -> Result<Option<Session>> {
    let Some(session) = store.load()? else {
        return Ok(None);
    };

    let hash = token_hash(&session.token);
    let Some(stored) = storage.session_by_token_hash(&hash)? else {
        warn!("Stored session token is not recognized, discarding it");
        store.clear()?;
        return Ok(None);
    };

    if now >= stored.expires_at {
        info!(username = %stored.account.username, "Session expired");
        storage.delete_session(&hash)?;
        store.clear()?;
        return Ok(None);
    }

    let actor = stored.account.actor();
    if actor != session.actor {
        debug!(username = %actor.username, "Session file actor differs from account, using account");
    }

    Ok(Some(Session {
        token: session.token,
        actor,
        issued_at: stored.issued_at,
        expires_at: stored.expires_at,
    }))
}

/// The actor of the verified session at `now`.
///
/// # Errors
///
/// Returns [`Error::NotAuthenticated`] when there is no valid session.
pub fn require_actor(
    store: &dyn SessionStore,
    storage: &Storage,
    now: DateTime<Utc>,
) -> Result<Actor> {
    current_session(store, storage, now)?
        .map(|session| session.actor)
        .ok_or(Error::NotAuthenticated)
}

/// Revoke the stored session in `storage` and clear the store.
///
/// Returns whether a live session was revoked.
///
/// # Errors
///
/// Returns an error if the store or the database cannot be updated.
pub fn end_session(store: &dyn SessionStore, storage: &Storage) -> Result<bool> {
    let revoked = match store.load()? {
        Some(session) => storage.delete_session(&token_hash(&session.token))?,
        None => false,
    };
    store.clear()?;
    if revoked {
        info!("Logged out");
    }
    Ok(revoked)
}
