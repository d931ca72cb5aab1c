//! Vault Master Key generation and wrapping.
//!
//! This module provides:
//! - [`generate`] — produce a fresh random 256-bit VMK
//! - [`wrap`] — encrypt the VMK under a password-derived wrap key
//! - [`unwrap`] — recover the VMK, failing closed on a wrong key
//!
//! # Key Hierarchy
//!
//! ```text
//! master password ──Argon2id──► wrap key ──wraps──► random VMK
//!                                                      │
//!                                      encrypts credential records
//! ```
//!
//! The VMK never touches disk unwrapped; the wrap key is never persisted at
//! all. Rotating the master password re-wraps the *same* VMK under a new
//! wrap key, so existing credential ciphertexts stay decryptable.

use crate::error::CryptoError;
use crate::memory::SecretBytes;
use crate::symmetric;

/// VMK length in bytes (256 bits).
pub const VMK_LEN: usize = 32;

/// Wrap key length in bytes (256 bits).
pub const WRAP_KEY_LEN: usize = 32;

/// AAD tag binding a ciphertext to the VMK-wrapping context, so a wrapped
/// VMK can never be confused with an ordinary credential blob.
const VMK_WRAP_AAD: &[u8] = b"coffre-vmk-wrap-v1";

/// Generate a fresh random VMK with full 256-bit entropy.
///
/// Independent of any password — the password only ever guards the wrapping.
///
/// # Errors
///
/// Returns [`CryptoError::SecureMemory`] if the CSPRNG fails.
pub fn generate() -> Result<SecretBytes<VMK_LEN>, CryptoError> {
    SecretBytes::random()
}

/// Wrap a VMK under a wrap key (AES-256-GCM, confidentiality + integrity).
///
/// The output blob is opaque and safe to persist in the account record.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKeyMaterial`] if the wrap key is not
/// exactly 32 bytes, or [`CryptoError::Encryption`] if the seal fails.
pub fn wrap(wrap_key: &[u8], vmk: &SecretBytes<VMK_LEN>) -> Result<Vec<u8>, CryptoError> {
    check_wrap_key(wrap_key)?;
    symmetric::seal(vmk.expose(), wrap_key, VMK_WRAP_AAD)
}

/// Unwrap a VMK blob with a wrap key.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKeyMaterial`] if the wrap key is not
/// exactly 32 bytes. Returns [`CryptoError::Decryption`] if the wrap key is
/// wrong or the blob was tampered with — the constant-content failure that
/// callers surface as "incorrect credentials".
pub fn unwrap(wrap_key: &[u8], wrapped: &[u8]) -> Result<SecretBytes<VMK_LEN>, CryptoError> {
    check_wrap_key(wrap_key)?;
    let plaintext = symmetric::open(wrapped, wrap_key, VMK_WRAP_AAD)?;
    // A well-formed wrapped blob always opens to exactly 32 bytes; anything
    // else means the blob was not produced by `wrap`.
    SecretBytes::from_slice(plaintext.expose()).map_err(|_| CryptoError::Decryption)
}

fn check_wrap_key(wrap_key: &[u8]) -> Result<(), CryptoError> {
    if wrap_key.len() != WRAP_KEY_LEN {
        return Err(CryptoError::InvalidKeyMaterial(format!(
            "invalid wrap key length: {} bytes (expected {WRAP_KEY_LEN})",
            wrap_key.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
