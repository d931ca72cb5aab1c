//! Vault error types for `coffre-vault`.
//!
//! This is the operation-level taxonomy the HTTP layer maps to status
//! codes. Two rules shape it:
//!
//! - Login failures are generic: an unknown username and a wrong master
//!   password both surface as [`VaultError::IncorrectCredentials`], so the
//!   response shape never reveals which one happened.
//! - Decryption failures are routine, not exceptional: a ciphertext that
//!   does not authenticate under the current session key is downgraded to
//!   [`VaultError::NotFound`] (or silently skipped in list/export) at the
//!   point of decryption, never propagated verbatim.

use coffre_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced by vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Cryptographic operation failed (delegated from crypto-core).
    ///
    /// Only non-decryption failures (bad parameters, CSPRNG) should ever
    /// escape with this variant; see the module docs.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Missing or malformed input (empty field, bad id, unusable CSV).
    #[error("{0}")]
    Validation(String),

    /// No active session where one is required.
    #[error("not logged in")]
    Unauthenticated,

    /// Login rejected. Identical for unknown user, wrong password, and
    /// corrupt account data.
    #[error("incorrect credentials")]
    IncorrectCredentials,

    /// Duplicate username at account creation.
    #[error("{0}")]
    Conflict(String),

    /// The vault is locked — credential operations are gated.
    #[error("vault is locked")]
    VaultLocked,

    /// Credential id (or other addressed record) is absent.
    #[error("not found")]
    NotFound,

    /// Too many recent login failures — attempts rejected until the window
    /// expires.
    #[error("login locked: {lockout_seconds}s remaining")]
    LockedOut {
        /// Whole seconds remaining in the lockout window.
        lockout_seconds: u64,
    },

    /// `SQLite` database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for VaultError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}
