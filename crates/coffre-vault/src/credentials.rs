//! Credential CRUD operations.
//!
//! Rows carry plaintext `site`/`username` metadata and an AES-256-GCM
//! password blob sealed under the session cipher. The table is not
//! partitioned by account: rows sealed under another account's VMK simply
//! fail to authenticate and are treated as absent — list and export skip
//! them, get and delete report `NotFound`. That decrypt-or-skip rule is
//! the isolation mechanism; see DESIGN.md.

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use zeroize::Zeroize;

use crate::error::VaultError;
use crate::session::SessionCipher;

// ---------------------------------------------------------------------------
// Domain model
// ---------------------------------------------------------------------------

/// A decrypted credential, as returned to callers.
#[derive(Debug, Serialize)]
pub struct Credential {
    /// Stable numeric identifier, assigned on insert.
    pub id: i64,
    /// Site the credential belongs to (plaintext metadata).
    pub site: String,
    /// Username at that site (plaintext metadata).
    pub username: String,
    /// The decrypted password.
    pub password: String,
    /// ISO 8601 UTC insert timestamp, immutable.
    pub created_at: String,
}

/// Zeroize the password on drop. (De)serialization makes copies we cannot
/// reach; this covers the struct's own lifetime.
impl Drop for Credential {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// Current time in the stored timestamp format.
pub(crate) fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ---------------------------------------------------------------------------
// CRUD operations
// ---------------------------------------------------------------------------

/// Encrypt and insert a new credential. Returns the assigned id and the
/// insert timestamp.
///
/// # Errors
///
/// Returns [`VaultError::Crypto`] if encryption fails or
/// [`VaultError::Database`] if the insert fails.
pub fn add(
    conn: &Connection,
    cipher: &SessionCipher,
    site: &str,
    username: &str,
    password: &str,
) -> Result<(i64, String), VaultError> {
    let ciphertext = cipher.encrypt(password.as_bytes())?;
    let created_at = now_iso8601();

    conn.execute(
        "INSERT INTO credentials (site, username, password_ciphertext, created_at) \
         VALUES (?1, ?2, ?3, ?4)",
        params![site, username, ciphertext, created_at],
    )
    .map_err(|e| VaultError::Database(format!("failed to insert credential: {e}")))?;

    Ok((conn.last_insert_rowid(), created_at))
}

/// Fetch and decrypt a credential by id.
///
/// # Errors
///
/// Returns [`VaultError::NotFound`] if the id is absent — or if the row
/// does not decrypt under this session (another account's row must be
/// indistinguishable from a missing one).
pub fn get(conn: &Connection, cipher: &SessionCipher, id: i64) -> Result<Credential, VaultError> {
    let row = conn
        .query_row(
            "SELECT site, username, password_ciphertext, created_at \
             FROM credentials WHERE id = ?1",
            [id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((site, username, ciphertext, created_at)) = row else {
        return Err(VaultError::NotFound);
    };

    let password = decrypt_to_string(cipher, &ciphertext).ok_or(VaultError::NotFound)?;

    Ok(Credential {
        id,
        site,
        username,
        password,
        created_at,
    })
}

/// List every credential decryptable under the current session.
///
/// Rows that fail to authenticate are silently excluded — the result set
/// shrinks, no error is raised.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn list(conn: &Connection, cipher: &SessionCipher) -> Result<Vec<Credential>, VaultError> {
    let mut stmt = conn.prepare(
        "SELECT id, site, username, password_ciphertext, created_at \
         FROM credentials ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Vec<u8>>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut credentials = Vec::new();
    for row in rows {
        let (id, site, username, ciphertext, created_at) = row?;
        let Some(password) = decrypt_to_string(cipher, &ciphertext) else {
            continue; // not ours
        };
        credentials.push(Credential {
            id,
            site,
            username,
            password,
            created_at,
        });
    }
    Ok(credentials)
}

/// Overwrite a credential's fields, re-encrypting the password under the
/// current session cipher.
///
/// Mirrors the original system: no existence check — updating an absent id
/// affects zero rows and still reports success. Recorded as an open
/// question in DESIGN.md.
///
/// # Errors
///
/// Returns [`VaultError::Crypto`] if encryption fails or
/// [`VaultError::Database`] if the update fails.
pub fn update(
    conn: &Connection,
    cipher: &SessionCipher,
    id: i64,
    site: &str,
    username: &str,
    password: &str,
) -> Result<(), VaultError> {
    let ciphertext = cipher.encrypt(password.as_bytes())?;
    conn.execute(
        "UPDATE credentials SET site = ?1, username = ?2, password_ciphertext = ?3 \
         WHERE id = ?4",
        params![site, username, ciphertext, id],
    )
    .map_err(|e| VaultError::Database(format!("failed to update credential: {e}")))?;
    Ok(())
}

/// Delete a credential by id, returning the decrypted record.
///
/// A row that does not decrypt under this session is left in place and
/// reported as [`VaultError::NotFound`] — a session never deletes another
/// account's data.
///
/// # Errors
///
/// Returns [`VaultError::NotFound`] for absent or foreign rows,
/// [`VaultError::Database`] if the delete fails.
pub fn delete(conn: &Connection, cipher: &SessionCipher, id: i64) -> Result<Credential, VaultError> {
    let credential = get(conn, cipher, id)?;
    conn.execute("DELETE FROM credentials WHERE id = ?1", [id])
        .map_err(|e| VaultError::Database(format!("failed to delete credential: {e}")))?;
    Ok(credential)
}

/// Whether a credential with this exact (site, username) pair exists.
///
/// Works on plaintext metadata only — no decryption, no hint about which
/// field differed.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn exists(conn: &Connection, site: &str, username: &str) -> Result<bool, VaultError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM credentials WHERE site = ?1 AND username = ?2",
            params![site, username],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Decrypt a password blob to a `String`, or `None` if it does not
/// authenticate under this session (or is not valid UTF-8 — equally
/// "not ours").
fn decrypt_to_string(cipher: &SessionCipher, ciphertext: &[u8]) -> Option<String> {
    let plaintext = cipher.decrypt(ciphertext).ok()?;
    String::from_utf8(plaintext.expose().to_vec()).ok()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
