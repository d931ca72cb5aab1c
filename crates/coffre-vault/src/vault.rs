//! The `Vault` facade — one owned object per process, injected into the
//! HTTP layer.
//!
//! Owns the database connection and the session state, each behind its own
//! mutex. The session mutex serializes every check-then-act sequence
//! (login's lockout-check → authenticate → open-session, logout/lock), so
//! two concurrent failed logins cannot both read `failed_attempts = 2` and
//! lose an increment.
//!
//! Lock order is session before connection, everywhere. Credential
//! operations take only a cipher *snapshot* from the session and release
//! that lock before touching storage.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::Connection;

use coffre_crypto_core::kdf::Argon2idParams;

use crate::credentials::{self, Credential};
use crate::db::VaultDb;
use crate::error::VaultError;
use crate::export::{self, ExportFormat};
use crate::import::{self, ImportSummary};
use crate::lockout::{self, LockoutStatus};
use crate::session::SessionState;
use crate::{accounts, session};

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// Process-wide vault handle: storage plus the single active session.
pub struct Vault {
    conn: Mutex<Connection>,
    session: Mutex<SessionState>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Vault(..)")
    }
}

impl Vault {
    /// Open (or create) the vault database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] if opening or migrating fails.
    pub fn open(path: &Path) -> Result<Self, VaultError> {
        Ok(Self::from_db(VaultDb::open(path)?))
    }

    /// Open an in-memory vault (tests).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] if migrating fails.
    pub fn open_in_memory() -> Result<Self, VaultError> {
        Ok(Self::from_db(VaultDb::open_in_memory()?))
    }

    fn from_db(db: VaultDb) -> Self {
        Self {
            conn: Mutex::new(db.into_connection()),
            session: Mutex::new(SessionState::new()),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, VaultError> {
        self.conn
            .lock()
            .map_err(|_| VaultError::Database("connection lock poisoned".into()))
    }

    fn session(&self) -> Result<MutexGuard<'_, SessionState>, VaultError> {
        self.session
            .lock()
            .map_err(|_| VaultError::Database("session lock poisoned".into()))
    }

    /// Snapshot the session cipher for one credential operation.
    fn cipher(&self) -> Result<std::sync::Arc<session::SessionCipher>, VaultError> {
        self.session()?.cipher()
    }

    // -----------------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------------

    /// Create an account with default KDF parameters. Does not log in.
    ///
    /// # Errors
    ///
    /// See [`accounts::create_account`].
    pub fn create_account(&self, username: &str, master_password: &str) -> Result<(), VaultError> {
        accounts::create_account(&*self.conn()?, username, master_password)
    }

    /// Create an account with explicit KDF parameters (tuning, tests).
    ///
    /// # Errors
    ///
    /// See [`accounts::create_account_with_params`].
    pub fn create_account_with_params(
        &self,
        username: &str,
        master_password: &str,
        params: &Argon2idParams,
    ) -> Result<(), VaultError> {
        accounts::create_account_with_params(&*self.conn()?, username, master_password, params)
    }

    /// Authenticate and open a session.
    ///
    /// The lockout governor is consulted first — while a window is active
    /// the account store is never touched. Any authentication failure
    /// records one failed attempt and surfaces as the generic
    /// [`VaultError::IncorrectCredentials`]; success resets the governor.
    ///
    /// # Errors
    ///
    /// - [`VaultError::LockedOut`] while a lockout window is active
    /// - [`VaultError::IncorrectCredentials`] on any authentication failure
    /// - [`VaultError::Database`] on storage failure
    pub fn login(&self, username: &str, master_password: &str) -> Result<(), VaultError> {
        let mut session = self.session()?;
        let conn = self.conn()?;
        let now = Utc::now().timestamp();

        let status = lockout::status(&conn, now)?;
        if status.locked {
            return Err(VaultError::LockedOut {
                lockout_seconds: status.lockout_seconds,
            });
        }

        match accounts::authenticate(&conn, username, master_password) {
            Ok(master_key) => {
                lockout::reset(&conn)?;
                session.open_session(username, master_key);
                Ok(())
            }
            Err(VaultError::IncorrectCredentials) => {
                lockout::record_failed_attempt(&conn, now)?;
                Err(VaultError::IncorrectCredentials)
            }
            Err(other) => Err(other),
        }
    }

    /// End the session (equivalent to lock).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] only if the session lock is poisoned.
    pub fn logout(&self) -> Result<(), VaultError> {
        self.session()?.close_session();
        Ok(())
    }

    /// Lock the vault immediately. Reachable without a prior logout.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] only if the session lock is poisoned.
    pub fn lock(&self) -> Result<(), VaultError> {
        self.session()?.close_session();
        Ok(())
    }

    /// Clear the lock flag without logging in. Credential operations then
    /// fail with [`VaultError::Unauthenticated`] instead of
    /// [`VaultError::VaultLocked`].
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] only if the session lock is poisoned.
    pub fn unlock(&self) -> Result<(), VaultError> {
        self.session()?.unlock();
        Ok(())
    }

    /// Whether the vault is currently locked.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] only if the session lock is poisoned.
    pub fn is_locked(&self) -> Result<bool, VaultError> {
        Ok(self.session()?.is_locked())
    }

    /// Read-only lockout snapshot at the current wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Database`] on storage failure.
    pub fn lockout_status(&self) -> Result<LockoutStatus, VaultError> {
        lockout::status(&*self.conn()?, Utc::now().timestamp())
    }

    /// Rotate the master password for the logged-in account.
    ///
    /// Re-wraps the session's live VMK; credential ciphertexts are
    /// untouched. The old password is not re-verified (preserved original
    /// behavior — see DESIGN.md).
    ///
    /// # Errors
    ///
    /// - [`VaultError::Unauthenticated`] without an active session
    /// - [`VaultError::Validation`] for an empty new password
    /// - [`VaultError::Database`] on storage failure
    pub fn change_master_password(&self, new_password: &str) -> Result<(), VaultError> {
        let (username, cipher) = {
            let session = self.session()?;
            // The original reports "not logged in" for a locked vault too.
            let cipher = session.cipher().map_err(|_| VaultError::Unauthenticated)?;
            let username = session
                .current_user()
                .ok_or(VaultError::Unauthenticated)?
                .to_owned();
            (username, cipher)
        };
        accounts::rotate_master_password(
            &*self.conn()?,
            &username,
            new_password,
            cipher.master_key(),
        )
    }

    // -----------------------------------------------------------------------
    // Credentials
    // -----------------------------------------------------------------------

    /// Encrypt and store a credential. Returns the new id and insert
    /// timestamp.
    ///
    /// # Errors
    ///
    /// [`VaultError::VaultLocked`] / [`VaultError::Unauthenticated`] without
    /// a session; otherwise see [`credentials::add`].
    pub fn add_credential(
        &self,
        site: &str,
        username: &str,
        password: &str,
    ) -> Result<(i64, String), VaultError> {
        let cipher = self.cipher()?;
        credentials::add(&*self.conn()?, &cipher, site, username, password)
    }

    /// Fetch and decrypt a credential by id.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotFound`] for absent or foreign rows; session gating
    /// as for [`Self::add_credential`].
    pub fn get_credential(&self, id: i64) -> Result<Credential, VaultError> {
        let cipher = self.cipher()?;
        credentials::get(&*self.conn()?, &cipher, id)
    }

    /// List all credentials decryptable under the current session.
    ///
    /// # Errors
    ///
    /// Session gating as for [`Self::add_credential`];
    /// [`VaultError::Database`] on storage failure.
    pub fn list_credentials(&self) -> Result<Vec<Credential>, VaultError> {
        let cipher = self.cipher()?;
        credentials::list(&*self.conn()?, &cipher)
    }

    /// Overwrite a credential's fields, re-encrypting under the current
    /// session.
    ///
    /// # Errors
    ///
    /// Session gating as for [`Self::add_credential`]; see
    /// [`credentials::update`].
    pub fn update_credential(
        &self,
        id: i64,
        site: &str,
        username: &str,
        password: &str,
    ) -> Result<(), VaultError> {
        let cipher = self.cipher()?;
        credentials::update(&*self.conn()?, &cipher, id, site, username, password)
    }

    /// Delete a credential by id, returning the decrypted record.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotFound`] for absent or foreign rows; session gating
    /// as for [`Self::add_credential`].
    pub fn delete_credential(&self, id: i64) -> Result<Credential, VaultError> {
        let cipher = self.cipher()?;
        credentials::delete(&*self.conn()?, &cipher, id)
    }

    /// Whether a credential with this exact (site, username) pair exists.
    ///
    /// # Errors
    ///
    /// Session gating as for [`Self::add_credential`];
    /// [`VaultError::Database`] on storage failure.
    pub fn check_duplicate(&self, site: &str, username: &str) -> Result<bool, VaultError> {
        let _cipher = self.cipher()?;
        credentials::exists(&*self.conn()?, site, username)
    }

    // -----------------------------------------------------------------------
    // Import / export
    // -----------------------------------------------------------------------

    /// Parse CSV text and import its rows under the current session.
    ///
    /// # Errors
    ///
    /// Session gating as for [`Self::add_credential`]; see
    /// [`import::import_csv`].
    pub fn import_csv(
        &self,
        text: &str,
        allow_duplicates: bool,
    ) -> Result<ImportSummary, VaultError> {
        let cipher = self.cipher()?;
        import::import_csv(&*self.conn()?, &cipher, text, allow_duplicates)
    }

    /// Export the session's credentials as JSON or CSV plaintext.
    ///
    /// # Errors
    ///
    /// Session gating as for [`Self::add_credential`]; see
    /// [`export::export`].
    pub fn export(&self, format: ExportFormat) -> Result<String, VaultError> {
        let cipher = self.cipher()?;
        export::export(&*self.conn()?, &cipher, format)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
