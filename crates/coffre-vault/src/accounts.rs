//! Account store and the registration/login/rotation protocol.
//!
//! One row per user: `username → (wrapped VMK, salt, KDF metadata)`. The
//! wrapped VMK is the only field that ever changes after creation (master
//! password rotation re-wraps the *same* VMK, so existing credential
//! ciphertexts stay decryptable). There is no account deletion.

use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};

use coffre_crypto_core::kdf::{self, Argon2idParams};
use coffre_crypto_core::memory::SecretBytes;
use coffre_crypto_core::vmk::{self, VMK_LEN};

use crate::error::VaultError;

/// Salt length in bytes, fixed at account creation for the account's life.
const SALT_LEN: usize = 16;

/// The one KDF currently supported. Stored per account so the scheme can
/// evolve without breaking older rows.
const KDF_ALGORITHM: &str = "argon2id";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A persisted account row.
#[derive(Debug)]
pub struct AccountRecord {
    /// Unique identifier, case-sensitive exact match.
    pub username: String,
    /// Authenticated ciphertext of the VMK under the password-derived key.
    pub wrapped_vmk: Vec<u8>,
    /// Random per-account salt, never rotated.
    pub salt: Vec<u8>,
    /// KDF identifier (`"argon2id"`).
    pub kdf_algorithm: String,
    /// Parameters to reproduce the derivation exactly.
    pub kdf_params: Argon2idParams,
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Create a new account with the default KDF parameters.
///
/// Does not log the user in.
///
/// # Errors
///
/// - [`VaultError::Validation`] if username or password is empty
/// - [`VaultError::Conflict`] if the username already exists
/// - [`VaultError::Crypto`] / [`VaultError::Database`] on derivation or
///   insert failure
pub fn create_account(
    conn: &Connection,
    username: &str,
    master_password: &str,
) -> Result<(), VaultError> {
    create_account_with_params(conn, username, master_password, &Argon2idParams::default())
}

/// Create a new account with explicit KDF parameters.
///
/// The parameters are persisted with the row, so accounts created under
/// different tuning coexist. Primarily useful for tests, which use cheap
/// parameters to keep suites fast.
///
/// # Errors
///
/// Same as [`create_account`].
pub fn create_account_with_params(
    conn: &Connection,
    username: &str,
    master_password: &str,
    params: &Argon2idParams,
) -> Result<(), VaultError> {
    if username.is_empty() || master_password.is_empty() {
        return Err(VaultError::Validation("missing fields".into()));
    }

    if account_exists(conn, username)? {
        return Err(VaultError::Conflict("username already exists".into()));
    }

    let mut salt = vec![0u8; SALT_LEN];
    OsRng.try_fill_bytes(&mut salt).map_err(|e| {
        VaultError::Crypto(coffre_crypto_core::CryptoError::SecureMemory(format!(
            "CSPRNG fill failed: {e}"
        )))
    })?;

    let wrap_key = kdf::derive_wrap_key(master_password.as_bytes(), &salt, params)?;
    let master_key = vmk::generate()?;
    let wrapped_vmk = vmk::wrap(wrap_key.expose(), &master_key)?;

    let params_json = serde_json::to_string(params)
        .map_err(|e| VaultError::Database(format!("failed to serialize kdf params: {e}")))?;

    conn.execute(
        "INSERT INTO accounts (username, wrapped_vmk, salt, kdf_algorithm, kdf_params) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![username, wrapped_vmk, salt, KDF_ALGORITHM, params_json],
    )
    .map_err(|e| VaultError::Database(format!("failed to insert account: {e}")))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Verify a master password and recover the account's VMK.
///
/// Every failure path — unknown username, wrong password, corrupt stored
/// data — collapses to [`VaultError::IncorrectCredentials`] so the caller's
/// response cannot be used to enumerate usernames.
///
/// # Errors
///
/// [`VaultError::IncorrectCredentials`] on any authentication failure;
/// [`VaultError::Database`] only for query-level failures.
pub fn authenticate(
    conn: &Connection,
    username: &str,
    master_password: &str,
) -> Result<SecretBytes<VMK_LEN>, VaultError> {
    let Some(account) = load_account(conn, username)? else {
        return Err(VaultError::IncorrectCredentials);
    };

    let wrap_key =
        kdf::derive_wrap_key(master_password.as_bytes(), &account.salt, &account.kdf_params)
            .map_err(|_| VaultError::IncorrectCredentials)?;

    vmk::unwrap(wrap_key.expose(), &account.wrapped_vmk)
        .map_err(|_| VaultError::IncorrectCredentials)
}

/// Load an account row, or `None` if the username is unknown.
///
/// Corrupt KDF metadata is reported as `None` rather than an error — to a
/// caller mid-login it must be indistinguishable from an absent account.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query itself fails.
pub fn load_account(conn: &Connection, username: &str) -> Result<Option<AccountRecord>, VaultError> {
    let row = conn
        .query_row(
            "SELECT username, wrapped_vmk, salt, kdf_algorithm, kdf_params \
             FROM accounts WHERE username = ?1",
            [username],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((username, wrapped_vmk, salt, kdf_algorithm, params_json)) = row else {
        return Ok(None);
    };

    let Ok(kdf_params) = serde_json::from_str::<Argon2idParams>(&params_json) else {
        return Ok(None);
    };

    Ok(Some(AccountRecord {
        username,
        wrapped_vmk,
        salt,
        kdf_algorithm,
        kdf_params,
    }))
}

/// Whether a username is already taken.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn account_exists(conn: &Connection, username: &str) -> Result<bool, VaultError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM accounts WHERE username = ?1",
            [username],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

// ---------------------------------------------------------------------------
// Master password rotation
// ---------------------------------------------------------------------------

/// Re-wrap an account's VMK under a key derived from a new master password.
///
/// Takes the live VMK from the caller's session rather than re-deriving
/// from storage, and keeps the account's original salt and KDF parameters.
/// The VMK itself never changes, so no credential is re-encrypted.
///
/// Note: the caller is not asked to prove knowledge of the old password —
/// an active session is the only gate. Recorded as an open product
/// question in DESIGN.md; do not "fix" silently.
///
/// # Errors
///
/// - [`VaultError::Validation`] if the new password is empty
/// - [`VaultError::NotFound`] if the account row has vanished
/// - [`VaultError::Crypto`] / [`VaultError::Database`] on derivation or
///   update failure
pub fn rotate_master_password(
    conn: &Connection,
    username: &str,
    new_password: &str,
    current_vmk: &SecretBytes<VMK_LEN>,
) -> Result<(), VaultError> {
    if new_password.is_empty() {
        return Err(VaultError::Validation("missing fields".into()));
    }

    let Some(account) = load_account(conn, username)? else {
        return Err(VaultError::NotFound);
    };

    let new_wrap_key =
        kdf::derive_wrap_key(new_password.as_bytes(), &account.salt, &account.kdf_params)?;
    let new_wrapped_vmk = vmk::wrap(new_wrap_key.expose(), current_vmk)?;

    conn.execute(
        "UPDATE accounts SET wrapped_vmk = ?1 WHERE username = ?2",
        params![new_wrapped_vmk, username],
    )
    .map_err(|e| VaultError::Database(format!("failed to update account: {e}")))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
