//! Login lockout governor — exponential backoff on repeated failures.
//!
//! A two-state machine persisted as a singleton row:
//!
//! - **Open**: attempts allowed. Each failure increments the counter; the
//!   failure that brings it to the threshold opens a lockout window of
//!   `15s * 2^(failures - 3)` (15s, 30s, 60s, ...).
//! - **Locked**: attempts rejected until `lockout_until`. Failures during
//!   an active window neither increment the counter nor extend the window.
//!
//! Expiry is evaluated lazily against the caller-supplied clock — there is
//! no background timer. Any successful login deletes the row entirely.
//!
//! The governor is deliberately global, not keyed by username or client:
//! one counter for the whole process. See DESIGN.md for the multi-user
//! implication.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::VaultError;

/// Failure count at which the first lockout window opens.
pub const LOCKOUT_THRESHOLD: u32 = 3;

/// First lockout window length in seconds.
pub const BASE_LOCKOUT_SECS: i64 = 15;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Read-only lockout snapshot, recomputed from the current time.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LockoutStatus {
    /// Whether a lockout window is currently active.
    pub locked: bool,
    /// Whole seconds remaining in the window (0 when open).
    pub lockout_seconds: u64,
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Query the current lockout state at time `now` (epoch seconds).
///
/// Never mutates state — an expired window simply reads as open.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the query fails.
pub fn status(conn: &Connection, now: i64) -> Result<LockoutStatus, VaultError> {
    let (_, lockout_until) = read_state(conn)?;

    let remaining = lockout_until
        .map(|until| until.saturating_sub(now))
        .unwrap_or(0);

    if remaining > 0 {
        Ok(LockoutStatus {
            locked: true,
            lockout_seconds: u64::try_from(remaining).unwrap_or(0),
        })
    } else {
        Ok(LockoutStatus {
            locked: false,
            lockout_seconds: 0,
        })
    }
}

/// Record a failed login attempt at time `now`.
///
/// No-op while a window is active: only the first crossing of the
/// threshold (and each post-expiry failure) sets a new window.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the read or write fails.
pub fn record_failed_attempt(conn: &Connection, now: i64) -> Result<(), VaultError> {
    let (failed_attempts, lockout_until) = read_state(conn)?;

    if lockout_until.is_some_and(|until| now < until) {
        return Ok(());
    }

    let failed_attempts = failed_attempts.saturating_add(1);
    let lockout_until = if failed_attempts >= LOCKOUT_THRESHOLD {
        Some(now.saturating_add(window_secs(failed_attempts)))
    } else {
        None
    };

    conn.execute(
        "INSERT OR REPLACE INTO lockout_state (id, failed_attempts, lockout_until) \
         VALUES (1, ?1, ?2)",
        params![failed_attempts, lockout_until],
    )?;
    Ok(())
}

/// Reset to the Open state (successful login). Deletes the singleton row.
///
/// # Errors
///
/// Returns [`VaultError::Database`] if the delete fails.
pub fn reset(conn: &Connection) -> Result<(), VaultError> {
    conn.execute("DELETE FROM lockout_state WHERE id = 1", [])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn read_state(conn: &Connection) -> Result<(u32, Option<i64>), VaultError> {
    let row = conn
        .query_row(
            "SELECT failed_attempts, lockout_until FROM lockout_state WHERE id = 1",
            [],
            |row| Ok((row.get::<_, u32>(0)?, row.get::<_, Option<i64>>(1)?)),
        )
        .optional()?;
    Ok(row.unwrap_or((0, None)))
}

/// Window length for a given failure count: `15s * 2^(failures - 3)`,
/// saturating for absurd counts.
fn window_secs(failed_attempts: u32) -> i64 {
    let exponent = failed_attempts.saturating_sub(LOCKOUT_THRESHOLD).min(32);
    let multiplier = 1i64.checked_shl(exponent).unwrap_or(i64::MAX);
    BASE_LOCKOUT_SECS.saturating_mul(multiplier)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
