//! Argon2id wrap-key derivation.
//!
//! This module provides:
//! - [`derive_wrap_key`] — derive a symmetric wrap key from a master
//!   password + salt using Argon2id
//! - [`Argon2idParams`] — serializable parameter set, persisted per account
//!
//! Parameters are stored alongside each account so they can be tuned for
//! new accounts over time without breaking older ones: login always
//! re-derives with exactly the parameters recorded at account creation.

use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Default wrap-key length in bytes (256 bits, AES-256-GCM key size).
pub const WRAP_KEY_LEN: usize = 32;

/// Minimum salt length in bytes. We enforce 16 (stricter than argon2's 8).
const MIN_SALT_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Argon2id parameter set — persisted (as JSON) in the account record.
///
/// Fields use the `argon2` crate convention:
/// - `m_cost`: memory in KiB (NOT bytes, NOT MB)
/// - `t_cost`: number of iterations
/// - `p_cost`: degree of parallelism
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2idParams {
    /// Number of iterations (time cost).
    pub t_cost: u32,
    /// Memory cost in kibibytes. 64 MiB = `65_536`.
    pub m_cost: u32,
    /// Degree of parallelism (number of lanes).
    pub p_cost: u32,
    /// Derived key length in bytes.
    pub output_len: usize,
    /// Argon2 version identifier (`0x13` = 19 for the current version).
    pub version: u32,
}

impl Default for Argon2idParams {
    /// Account-creation defaults: t=3, m=64 MiB, p=2, 32-byte output,
    /// Argon2 version 0x13.
    fn default() -> Self {
        Self {
            t_cost: 3,
            m_cost: 65_536,
            p_cost: 2,
            output_len: WRAP_KEY_LEN,
            version: 0x13,
        }
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive a wrap key from a master password and salt using Argon2id.
///
/// Deterministic: the same password, salt, and parameters always yield the
/// same key. Returns a [`SecretBuffer`] of `params.output_len` bytes; the
/// intermediate buffer is zeroized after the copy.
///
/// No password policy is applied here — length and complexity rules belong
/// to the caller.
///
/// # Errors
///
/// Returns [`CryptoError::KeyDerivation`] if:
/// - The salt is shorter than 16 bytes
/// - The parameter set or version is invalid
/// - The derivation itself fails (e.g., memory allocation)
pub fn derive_wrap_key(
    master_password: &[u8],
    salt: &[u8],
    params: &Argon2idParams,
) -> Result<SecretBuffer, CryptoError> {
    if salt.len() < MIN_SALT_LEN {
        return Err(CryptoError::KeyDerivation(format!(
            "salt too short: {} bytes (minimum {MIN_SALT_LEN})",
            salt.len()
        )));
    }

    let argon2_params = argon2::Params::new(
        params.m_cost,
        params.t_cost,
        params.p_cost,
        Some(params.output_len),
    )
    .map_err(|e| CryptoError::KeyDerivation(format!("invalid argon2 params: {e}")))?;

    let version = argon2::Version::try_from(params.version)
        .map_err(|e| CryptoError::KeyDerivation(format!("invalid argon2 version: {e}")))?;

    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, version, argon2_params);

    let mut output = vec![0u8; params.output_len];
    argon2
        .hash_password_into(master_password, salt, &mut output)
        .map_err(|e| CryptoError::KeyDerivation(format!("argon2id derivation failed: {e}")))?;

    let result = SecretBuffer::new(&output);
    output.zeroize();
    Ok(result)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Small params for fast tests — 32 KiB, 1 iteration, 1 lane.
    const TEST_PARAMS: Argon2idParams = Argon2idParams {
        t_cost: 1,
        m_cost: 32,
        p_cost: 1,
        output_len: 32,
        version: 0x13,
    };

    const TEST_SALT: &[u8; 16] = b"0123456789abcdef";

    #[test]
    fn derive_produces_requested_length() {
        let key =
            derive_wrap_key(b"password", TEST_SALT, &TEST_PARAMS).expect("derive should succeed");
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn derive_is_deterministic() {
        let a = derive_wrap_key(b"password", TEST_SALT, &TEST_PARAMS).expect("derive");
        let b = derive_wrap_key(b"password", TEST_SALT, &TEST_PARAMS).expect("derive");
        assert_eq!(a.expose(), b.expose());
    }

    #[test]
    fn derive_different_salts_produce_different_keys() {
        let a = derive_wrap_key(b"password", b"salt_aaaaaaaaaaaaa", &TEST_PARAMS).expect("derive");
        let b = derive_wrap_key(b"password", b"salt_bbbbbbbbbbbbb", &TEST_PARAMS).expect("derive");
        assert_ne!(a.expose(), b.expose());
    }

    #[test]
    fn derive_different_passwords_produce_different_keys() {
        let a = derive_wrap_key(b"password_a", TEST_SALT, &TEST_PARAMS).expect("derive");
        let b = derive_wrap_key(b"password_b", TEST_SALT, &TEST_PARAMS).expect("derive");
        assert_ne!(a.expose(), b.expose());
    }

    #[test]
    fn derive_rejects_short_salt() {
        let err = derive_wrap_key(b"password", b"short", &TEST_PARAMS)
            .expect_err("short salt should be rejected");
        assert!(format!("{err}").contains("salt too short"));
    }

    #[test]
    fn derive_rejects_unknown_version() {
        let params = Argon2idParams {
            version: 7,
            ..TEST_PARAMS
        };
        let result = derive_wrap_key(b"password", TEST_SALT, &params);
        assert!(matches!(result, Err(CryptoError::KeyDerivation(_))));
    }

    #[test]
    fn default_params_match_account_creation_policy() {
        let p = Argon2idParams::default();
        assert_eq!(p.t_cost, 3);
        assert_eq!(p.m_cost, 65_536);
        assert_eq!(p.p_cost, 2);
        assert_eq!(p.output_len, 32);
        assert_eq!(p.version, 0x13);
    }

    #[test]
    fn params_serde_roundtrip() {
        let params = Argon2idParams::default();
        let json = serde_json::to_string(&params).expect("serialize");
        let restored: Argon2idParams = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(params, restored);
    }

    #[test]
    fn derive_output_is_secret_buffer() {
        let key = derive_wrap_key(b"test", TEST_SALT, &TEST_PARAMS).expect("derive");
        assert_eq!(format!("{key:?}"), "SecretBuffer(***)");
    }
}
