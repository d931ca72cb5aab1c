//! Plaintext export of the current session's credentials.
//!
//! Export applies the same decrypt-or-skip rule as listing: rows sealed
//! under another account's VMK are silently dropped from the output. The
//! output is deliberately unencrypted — warning the user is the caller's
//! job, no redaction happens here.
//!
//! Both shapes are wire contracts and must stay stable across versions:
//!
//! - JSON: `{"version":1,"exported_at":"<ISO-8601 UTC>","items":[...]}`
//! - CSV: header `site,username,password`, one row per credential

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::credentials;
use crate::error::VaultError;
use crate::session::SessionCipher;

/// Export envelope version.
const EXPORT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// JSON envelope with version and timestamp.
    Json,
    /// Bare CSV with a `site,username,password` header.
    Csv,
}

impl ExportFormat {
    /// Parse a user-supplied format name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Validation`] for anything but `json`/`csv`.
    pub fn parse(s: &str) -> Result<Self, VaultError> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(VaultError::Validation(format!(
                "unknown export format: {other}"
            ))),
        }
    }
}

/// One exported credential triple.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportItem {
    /// Site the credential belongs to.
    pub site: String,
    /// Username at that site.
    pub username: String,
    /// Decrypted plaintext password.
    pub password: String,
}

/// The JSON export envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportEnvelope {
    /// Envelope format version.
    pub version: u32,
    /// ISO 8601 UTC timestamp of the export.
    pub exported_at: String,
    /// Surviving (decryptable) credentials.
    pub items: Vec<ExportItem>,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Serialize every credential decryptable under the session cipher.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the row scan fails. Undecryptable
/// rows are skipped, never errors.
pub fn export(
    conn: &Connection,
    cipher: &SessionCipher,
    format: ExportFormat,
) -> Result<String, VaultError> {
    let items: Vec<ExportItem> = credentials::list(conn, cipher)?
        .into_iter()
        .map(|c| ExportItem {
            site: c.site.clone(),
            username: c.username.clone(),
            password: c.password.clone(),
        })
        .collect();

    match format {
        ExportFormat::Json => serialize_json(items),
        ExportFormat::Csv => serialize_csv(&items),
    }
}

fn serialize_json(items: Vec<ExportItem>) -> Result<String, VaultError> {
    let envelope = ExportEnvelope {
        version: EXPORT_VERSION,
        exported_at: credentials::now_iso8601(),
        items,
    };
    serde_json::to_string(&envelope)
        .map_err(|e| VaultError::Database(format!("failed to serialize export: {e}")))
}

fn serialize_csv(items: &[ExportItem]) -> Result<String, VaultError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["site", "username", "password"])
        .map_err(|e| VaultError::Database(format!("failed to write CSV header: {e}")))?;
    for item in items {
        writer
            .write_record([&item.site, &item.username, &item.password])
            .map_err(|e| VaultError::Database(format!("failed to write CSV row: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| VaultError::Database(format!("failed to flush CSV: {e}")))?;
    String::from_utf8(bytes).map_err(|e| VaultError::Database(format!("non-UTF-8 CSV: {e}")))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
