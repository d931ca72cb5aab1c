//! Bulk CSV import with duplicate-skip policy.
//!
//! Import is two phases with different failure semantics:
//!
//! 1. **Header validation** is all-or-nothing: if any of `site`,
//!    `username`, `password` cannot be matched (case- and
//!    separator-insensitively), the whole import is rejected and no row is
//!    touched.
//! 2. **Row processing** is best-effort: malformed rows become
//!    `parse_errors`, duplicate pairs become `skipped`, encrypt/insert
//!    failures become `errors` — none of them aborts the batch.
//!
//! Duplicate filtering consults storage per row, so a pair appearing twice
//! in one file is inserted once and skipped once.

use rusqlite::Connection;
use serde::Serialize;
use zeroize::Zeroize;

use crate::credentials;
use crate::error::VaultError;
use crate::session::SessionCipher;

/// Headers a CSV must provide (after normalization).
const REQUIRED_HEADERS: [&str; 3] = ["site", "username", "password"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One validated CSV row, ready for encryption.
#[derive(Debug)]
pub struct ParsedRow {
    /// Site value, trimmed.
    pub site: String,
    /// Username value, trimmed.
    pub username: String,
    /// Plaintext password value, trimmed.
    pub password: String,
}

impl Drop for ParsedRow {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// Outcome counts for a completed import.
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    /// Rows encrypted and inserted.
    pub inserted: usize,
    /// Rows pre-filtered as existing (site, username) duplicates.
    pub skipped: usize,
    /// Rows that failed at the encrypt/insert step.
    pub errors: usize,
    /// Row-level parse failures, as messages.
    pub parse_errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Normalize a header for matching: lowercase, strip `_`/`-` and
/// surrounding whitespace. `User_Name`, `user-name`, and `USERNAME` all
/// match `username`.
fn normalize_header(header: &str) -> String {
    header
        .trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parse CSV text into rows plus row-level error messages.
///
/// # Errors
///
/// Returns [`VaultError::Validation`] naming the missing columns if any
/// required header is absent (including the empty-input case). Row-level
/// problems are returned as data, not errors.
pub fn parse_csv(text: &str) -> Result<(Vec<ParsedRow>, Vec<String>), VaultError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| VaultError::Validation(format!("unreadable CSV header: {e}")))?
        .clone();

    // Map each required name to its column index.
    let mut columns = [0usize; REQUIRED_HEADERS.len()];
    let mut missing = Vec::new();
    for (slot, required) in columns.iter_mut().zip(REQUIRED_HEADERS) {
        match headers.iter().position(|h| normalize_header(h) == required) {
            Some(idx) => *slot = idx,
            None => missing.push(required),
        }
    }
    if !missing.is_empty() {
        return Err(VaultError::Validation(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }
    let [site_col, username_col, password_col] = columns;

    let mut rows = Vec::new();
    let mut parse_errors = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let row_number = idx.saturating_add(1);
        let Ok(record) = record else {
            parse_errors.push(format!("row {row_number}: malformed row"));
            continue;
        };

        let field = |col: usize| record.get(col).map(str::trim).unwrap_or_default();
        let site = field(site_col);
        let username = field(username_col);
        let password = field(password_col);

        if site.is_empty() || username.is_empty() || password.is_empty() {
            parse_errors.push(format!("row {row_number}: missing required fields"));
            continue;
        }

        rows.push(ParsedRow {
            site: site.to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
        });
    }

    Ok((rows, parse_errors))
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Parse CSV text and import its rows under the session cipher.
///
/// With `allow_duplicates = false`, rows whose (site, username) pair
/// already exists in storage are counted as `skipped` and never reach
/// encryption.
///
/// # Errors
///
/// Returns [`VaultError::Validation`] on header failure (no rows are
/// processed). Per-row failures are reported in the summary instead.
pub fn import_csv(
    conn: &Connection,
    cipher: &SessionCipher,
    text: &str,
    allow_duplicates: bool,
) -> Result<ImportSummary, VaultError> {
    let (rows, parse_errors) = parse_csv(text)?;

    let mut summary = ImportSummary {
        inserted: 0,
        skipped: 0,
        errors: 0,
        parse_errors,
    };

    for row in &rows {
        if !allow_duplicates {
            match credentials::exists(conn, &row.site, &row.username) {
                Ok(true) => {
                    summary.skipped = summary.skipped.saturating_add(1);
                    continue;
                }
                Ok(false) => {}
                Err(_) => {
                    summary.errors = summary.errors.saturating_add(1);
                    continue;
                }
            }
        }

        match credentials::add(conn, cipher, &row.site, &row.username, &row.password) {
            Ok(_) => summary.inserted = summary.inserted.saturating_add(1),
            Err(_) => summary.errors = summary.errors.saturating_add(1),
        }
    }

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::VaultDb;
    use coffre_crypto_core::memory::SecretBytes;

    fn test_db() -> VaultDb {
        VaultDb::open_in_memory().expect("open should succeed")
    }

    fn test_cipher() -> SessionCipher {
        SessionCipher::new(SecretBytes::new([0x01; 32]))
    }

    #[test]
    fn parse_accepts_exact_headers() {
        let (rows, errors) = parse_csv("site,username,password\nexample.com,alice,secret\n")
            .expect("parse should succeed");
        assert!(errors.is_empty());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].site, "example.com");
        assert_eq!(rows[0].username, "alice");
        assert_eq!(rows[0].password, "secret");
    }

    #[test]
    fn parse_headers_are_case_and_separator_insensitive() {
        let (rows, errors) = parse_csv("Site,User_Name,PASS-WORD\nexample.com,alice,secret\n")
            .expect("parse should succeed");
        assert!(errors.is_empty());
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn parse_rejects_missing_header_listing_it() {
        let err = parse_csv("site,username\nexample.com,alice\n")
            .expect_err("missing header should be rejected");
        let VaultError::Validation(msg) = err else {
            panic!("expected Validation, got {err:?}");
        };
        assert!(msg.contains("missing required columns"));
        assert!(msg.contains("password"));
        assert!(!msg.contains("site,"));
    }

    #[test]
    fn parse_rejects_empty_input() {
        let err = parse_csv("").expect_err("empty input should be rejected");
        assert!(matches!(err, VaultError::Validation(_)));
    }

    #[test]
    fn parse_collects_row_errors_without_aborting() {
        let text = "site,username,password\n\
                    example.com,alice,secret\n\
                    ,blank,pass\n\
                    site2.com,,p2\n";
        let (rows, errors) = parse_csv(text).expect("parse should succeed");
        assert_eq!(rows.len(), 1);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("row 2"));
        assert!(errors[1].contains("row 3"));
    }

    #[test]
    fn import_inserts_and_skips_in_batch_duplicates() {
        let db = test_db();
        let cipher = test_cipher();
        let text = "site,username,password\n\
                    ex.com,u1,p1\n\
                    ex.com,u1,p1-dup\n\
                    ex.com,u2,p2\n";

        let summary =
            import_csv(db.connection(), &cipher, text, false).expect("import should succeed");
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 0);
        assert!(summary.parse_errors.is_empty());
    }

    #[test]
    fn import_is_idempotent_under_default_policy() {
        let db = test_db();
        let cipher = test_cipher();
        let text = "site,username,password\nex.com,u1,p1\nex.com,u2,p2\n";

        let first =
            import_csv(db.connection(), &cipher, text, false).expect("first import");
        assert_eq!(first.inserted, 2);
        assert_eq!(first.skipped, 0);

        let second =
            import_csv(db.connection(), &cipher, text, false).expect("second import");
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 2);
    }

    #[test]
    fn import_with_allow_duplicates_inserts_everything() {
        let db = test_db();
        let cipher = test_cipher();
        let text = "site,username,password\nex.com,u1,p1\n";

        import_csv(db.connection(), &cipher, text, true).expect("first import");
        let second =
            import_csv(db.connection(), &cipher, text, true).expect("second import");
        assert_eq!(second.inserted, 1);
        assert_eq!(second.skipped, 0);

        let listed = credentials::list(db.connection(), &cipher).expect("list");
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn imported_rows_are_encrypted_at_rest() {
        let db = test_db();
        let cipher = test_cipher();
        import_csv(
            db.connection(),
            &cipher,
            "site,username,password\nex.com,u1,plaintext-marker\n",
            false,
        )
        .expect("import should succeed");

        let blob: Vec<u8> = db
            .connection()
            .query_row("SELECT password_ciphertext FROM credentials", [], |row| {
                row.get(0)
            })
            .expect("query");
        assert!(!blob
            .windows(b"plaintext-marker".len())
            .any(|w| w == b"plaintext-marker"));
    }
}
