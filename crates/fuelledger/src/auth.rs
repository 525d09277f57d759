//! Accounts, password verification and role gates.
//!
//! Passwords are stored as bcrypt hashes. A successful login produces a
//! [`Session`] carrying the [`Actor`] together with a random token and an
//! expiry. The token's hash is recorded in storage; persisting the session
//! itself is the job of a [`SessionStore`](crate::session::SessionStore).

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{AuthConfig, SessionConfig};
use crate::error::{Error, Result};
use crate::model::{Actor, Role};
use crate::session::{token_hash, Session};
use crate::storage::Storage;

/// An account as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Identifier assigned by storage.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// bcrypt hash of the password.
    #[serde(skip)]
    pub password_hash: String,
    /// Account role.
    pub role: Role,
    /// Human-readable name.
    pub display_name: String,
    /// Linked driver, for driver accounts.
    pub driver_id: Option<i64>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// The actor this account authenticates as.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            display_name: self.display_name.clone(),
            driver_id: self.driver_id,
        }
    }
}

/// An account to be created, with its plain-text password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// Login name.
    pub username: String,
    /// Plain-text password; hashed before storage.
    pub password: String,
    /// Account role.
    pub role: Role,
    /// Human-readable name.
    pub display_name: String,
    /// Linked driver, required for driver accounts.
    pub driver_id: Option<i64>,
}

/// Fail unless `actor` is an administrator.
///
/// # Errors
///
/// Returns [`Error::PermissionDenied`] for non-administrators.
pub fn require_admin(actor: &Actor, action: &str) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        debug!(username = %actor.username, action, "Rejected non-admin action");
        Err(Error::permission_denied(action, "the administrator role"))
    }
}

/// Creates accounts and verifies credentials.
#[derive(Debug)]
pub struct Authenticator<'a> {
    storage: &'a Storage,
    bcrypt_cost: u32,
    session_ttl: Duration,
}

impl<'a> Authenticator<'a> {
    /// Create an authenticator with explicit settings.
    #[must_use]
    pub fn new(storage: &'a Storage, bcrypt_cost: u32, session_ttl: Duration) -> Self {
        Self {
            storage,
            bcrypt_cost,
            session_ttl,
        }
    }

    /// Create an authenticator from configuration.
    #[must_use]
    pub fn from_config(storage: &'a Storage, auth: &AuthConfig, session: &SessionConfig) -> Self {
        Self::new(
            storage,
            auth.bcrypt_cost,
            Duration::minutes(i64::from(session.ttl_minutes)),
        )
    }

    /// Create an account without a permission check.
    ///
    /// Used for bootstrapping (seeding) and by [`Self::register`].
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank fields or a driver account
    /// without a valid driver link, [`Error::Conflict`] for a taken
    /// username, or a hashing or storage error.
    pub fn create_account(&self, account: &NewAccount) -> Result<i64> {
        let username = account.username.trim();
        if username.is_empty() {
            return Err(Error::invalid_input("username", "must not be empty"));
        }
        if account.password.is_empty() {
            return Err(Error::invalid_input("password", "must not be empty"));
        }
        if account.display_name.trim().is_empty() {
            return Err(Error::invalid_input("display_name", "must not be empty"));
        }

        let driver_id = match (account.role, account.driver_id) {
            (Role::Driver, None) => {
                return Err(Error::invalid_input(
                    "driver",
                    "driver accounts must be linked to a driver",
                ));
            }
            (Role::Driver, Some(id)) => {
                if self.storage.driver(id)?.is_none() {
                    return Err(Error::not_found("driver", id));
                }
                Some(id)
            }
            (Role::Administrator, _) => None,
        };

        let password_hash = bcrypt::hash(&account.password, self.bcrypt_cost)?;
        let normalized = NewAccount {
            username: username.to_string(),
            password: String::new(),
            role: account.role,
            display_name: account.display_name.trim().to_string(),
            driver_id,
        };
        let id = self.storage.insert_account(&normalized, &password_hash)?;
        info!(id, %username, role = %account.role, "Account created");
        Ok(id)
    }

    /// Create an account on behalf of `actor`. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] for non-administrators, otherwise
    /// the same errors as [`Self::create_account`].
    pub fn register(&self, actor: &Actor, account: &NewAccount) -> Result<i64> {
        require_admin(actor, "creating accounts")?;
        self.create_account(account)
    }

    /// Verify credentials and open a session.
    ///
    /// Unknown usernames and wrong passwords produce the same error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] on mismatch, or a storage or
    /// hashing error.
    pub fn login(&self, username: &str, password: &str, now: DateTime<Utc>) -> Result<Session> {
        let Some(account) = self.storage.account_by_username(username.trim())? else {
            debug!(%username, "Login for unknown username");
            return Err(Error::InvalidCredentials);
        };

        if !bcrypt::verify(password, &account.password_hash)? {
            warn!(%username, "Login with wrong password");
            return Err(Error::InvalidCredentials);
        }

        let session = Session {
            token: Uuid::new_v4().to_string(),
            actor: account.actor(),
            issued_at: now,
            expires_at: now + self.session_ttl,
        };
        self.storage.purge_expired_sessions(now)?;
        self.storage.insert_session(
            &token_hash(&session.token),
            account.id,
            session.issued_at,
            session.expires_at,
        )?;
        info!(%username, role = %account.role, "Logged in");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{admin, demo_storage, driver_actor};

    // Minimum cost keeps the tests fast.
    const TEST_COST: u32 = 4;

    fn authenticator(storage: &Storage) -> Authenticator<'_> {
        Authenticator::new(storage, TEST_COST, Duration::minutes(30))
    }

    fn new_admin(username: &str, password: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            password: password.to_string(),
            role: Role::Administrator,
            display_name: "Administrador MOPC".to_string(),
            driver_id: None,
        }
    }

    fn new_driver_account(driver_id: Option<i64>) -> NewAccount {
        NewAccount {
            username: "chofer1".to_string(),
            password: "chofer123".to_string(),
            role: Role::Driver,
            display_name: "Juan Pérez".to_string(),
            driver_id,
        }
    }

    #[test]
    fn test_login_success() {
        let storage = demo_storage();
        let auth = authenticator(&storage);
        auth.create_account(&new_admin("admin", "admin123")).unwrap();

        let now = Utc::now();
        let session = auth.login("admin", "admin123", now).unwrap();
        assert_eq!(session.actor.username, "admin");
        assert!(session.actor.is_admin());
        assert_eq!(session.expires_at - session.issued_at, Duration::minutes(30));
        assert!(Uuid::parse_str(&session.token).is_ok());

        let stored = storage
            .session_by_token_hash(&token_hash(&session.token))
            .unwrap()
            .unwrap();
        assert_eq!(stored.account.username, "admin");
        // Storage keeps microseconds.
        assert!((stored.expires_at - session.expires_at).num_milliseconds().abs() < 1);
    }

    #[test]
    fn test_login_purges_expired_sessions() {
        let storage = demo_storage();
        let auth = authenticator(&storage);
        auth.create_account(&new_admin("admin", "admin123")).unwrap();

        let now = Utc::now();
        let first = auth.login("admin", "admin123", now).unwrap();
        let later = now + Duration::minutes(45);
        let second = auth.login("admin", "admin123", later).unwrap();

        assert!(storage
            .session_by_token_hash(&token_hash(&first.token))
            .unwrap()
            .is_none());
        assert!(storage
            .session_by_token_hash(&token_hash(&second.token))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_login_wrong_password_and_unknown_user_look_alike() {
        let storage = demo_storage();
        let auth = authenticator(&storage);
        auth.create_account(&new_admin("admin", "admin123")).unwrap();

        let wrong = auth.login("admin", "nope", Utc::now()).unwrap_err();
        let unknown = auth.login("ghost", "admin123", Utc::now()).unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, Error::InvalidCredentials));
    }

    #[test]
    fn test_password_is_hashed() {
        let storage = demo_storage();
        let auth = authenticator(&storage);
        auth.create_account(&new_admin("admin", "admin123")).unwrap();

        let account = storage.account_by_username("admin").unwrap().unwrap();
        assert_ne!(account.password_hash, "admin123");
        assert!(account.password_hash.starts_with("$2"));
    }

    #[test]
    fn test_duplicate_username_conflicts() {
        let storage = demo_storage();
        let auth = authenticator(&storage);
        auth.create_account(&new_admin("admin", "a")).unwrap();
        let err = auth.create_account(&new_admin("admin", "b")).unwrap_err();
        assert_eq!(err.to_string(), "username 'admin' is already registered");
    }

    #[test]
    fn test_driver_account_needs_existing_driver() {
        let storage = demo_storage();
        let auth = authenticator(&storage);

        assert!(matches!(
            auth.create_account(&new_driver_account(None)).unwrap_err(),
            Error::InvalidInput { field: "driver", .. }
        ));
        assert!(matches!(
            auth.create_account(&new_driver_account(Some(99))).unwrap_err(),
            Error::NotFound { entity: "driver", .. }
        ));

        auth.create_account(&new_driver_account(Some(1))).unwrap();
        let session = auth.login("chofer1", "chofer123", Utc::now()).unwrap();
        assert_eq!(session.actor.driver_id, Some(1));
        assert_eq!(session.actor.role, Role::Driver);
    }

    #[test]
    fn test_admin_account_drops_driver_link() {
        let storage = demo_storage();
        let auth = authenticator(&storage);
        let mut account = new_admin("admin", "admin123");
        account.driver_id = Some(1);
        auth.create_account(&account).unwrap();
        let stored = storage.account_by_username("admin").unwrap().unwrap();
        assert_eq!(stored.driver_id, None);
    }

    #[test]
    fn test_blank_fields_rejected() {
        let storage = demo_storage();
        let auth = authenticator(&storage);
        assert!(auth.create_account(&new_admin("  ", "x")).is_err());
        assert!(auth.create_account(&new_admin("admin", "")).is_err());
    }

    #[test]
    fn test_register_requires_admin() {
        let storage = demo_storage();
        let auth = authenticator(&storage);
        let juan = driver_actor("Juan Pérez", Some(1));

        let err = auth.register(&juan, &new_admin("other", "x")).unwrap_err();
        assert!(err.is_auth_error());
        assert!(auth.register(&admin(), &new_admin("other", "x")).is_ok());
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&admin(), "anything").is_ok());
        let err = require_admin(&driver_actor("Juan", None), "adding vehicles").unwrap_err();
        assert_eq!(
            err.to_string(),
            "permission denied: adding vehicles requires the administrator role"
        );
    }

    #[test]
    fn test_account_actor() {
        let account = Account {
            id: 7,
            username: "chofer1".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Driver,
            display_name: "Juan Pérez".to_string(),
            driver_id: Some(1),
            created_at: Utc::now(),
        };
        let actor = account.actor();
        assert_eq!(actor.id, 7);
        assert_eq!(actor.driver_id, Some(1));
        assert!(!actor.is_admin());
    }
}
