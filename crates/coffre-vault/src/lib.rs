//! `coffre-vault` — Vault business logic for COFFRE.
//!
//! Accounts (wrapped-VMK storage and the login protocol), the session/lock
//! state machine, the login lockout governor, encrypted credential CRUD,
//! and CSV/JSON import/export — all over a plain `SQLite` database.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod db;
pub mod error;

pub mod accounts;
pub mod lockout;
pub mod session;

pub mod credentials;

pub mod import;

pub mod export;

pub mod vault;

pub use credentials::Credential;
pub use db::VaultDb;
pub use error::VaultError;
pub use export::{ExportEnvelope, ExportFormat, ExportItem};
pub use import::ImportSummary;
pub use lockout::{LockoutStatus, BASE_LOCKOUT_SECS, LOCKOUT_THRESHOLD};
pub use session::{SessionCipher, SessionState};
pub use vault::Vault;
