//! AES-256-GCM authenticated encryption.
//!
//! This module provides:
//! - [`seal`] — encrypt with a fresh random nonce, returning a single
//!   `nonce || ciphertext || tag` blob suitable for a database column
//! - [`open`] — authenticate and decrypt such a blob
//!
//! Both the wrapped VMK and every credential ciphertext use this format.
//! Decryption failure is a routine outcome here (wrong wrap key, another
//! account's credential row) and is reported as the constant
//! [`CryptoError::Decryption`] with no further detail.

use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead;
use zeroize::Zeroize;

/// AES-256-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// AES-256-GCM authentication tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// AES-256-GCM key length in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Shortest possible blob: nonce + empty ciphertext + tag.
const MIN_BLOB_LEN: usize = NONCE_LEN + TAG_LEN;

// ---------------------------------------------------------------------------
// Seal / open
// ---------------------------------------------------------------------------

/// Encrypt `plaintext` under `key`, binding `aad` into the authentication tag.
///
/// A fresh 96-bit nonce is drawn from `OsRng` per call and prepended to the
/// output, so sealing the same plaintext twice yields different blobs.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if the key is not exactly 32 bytes or
/// the underlying seal operation fails.
pub fn seal(plaintext: &[u8], key: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let sealing_key = make_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

    // Encrypt in place — the plaintext copy becomes the ciphertext.
    let mut in_out = plaintext.to_vec();
    let Ok(tag) = sealing_key.seal_in_place_separate_tag(nonce, aead::Aad::from(aad), &mut in_out)
    else {
        in_out.zeroize();
        return Err(CryptoError::Encryption(
            "AES-256-GCM encryption failed".into(),
        ));
    };

    let capacity = NONCE_LEN
        .saturating_add(in_out.len())
        .saturating_add(TAG_LEN);
    let mut blob = Vec::with_capacity(capacity);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&in_out);
    blob.extend_from_slice(tag.as_ref());
    Ok(blob)
}

/// Authenticate and decrypt a `nonce || ciphertext || tag` blob.
///
/// Returns the plaintext in a [`SecretBuffer`] (zeroized on drop); the
/// intermediate working buffer is zeroized after the copy.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if the key is not exactly 32 bytes.
/// Returns [`CryptoError::Decryption`] if the blob is too short, tampered,
/// or sealed under a different key or AAD.
pub fn open(blob: &[u8], key: &[u8], aad: &[u8]) -> Result<SecretBuffer, CryptoError> {
    let opening_key = make_key(key)?;

    // A truncated blob is indistinguishable from tampering to the caller.
    if blob.len() < MIN_BLOB_LEN {
        return Err(CryptoError::Decryption);
    }

    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(&blob[..NONCE_LEN]);
    let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

    let mut ct_tag = blob[NONCE_LEN..].to_vec();
    let plaintext_slice = opening_key
        .open_in_place(nonce, aead::Aad::from(aad), &mut ct_tag)
        .map_err(|_| CryptoError::Decryption)?;

    let result = SecretBuffer::new(plaintext_slice);
    ct_tag.zeroize();
    Ok(result)
}

fn make_key(key: &[u8]) -> Result<aead::LessSafeKey, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::Encryption(format!(
            "invalid key length: {} bytes (expected {KEY_LEN})",
            key.len()
        )));
    }
    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key)
        .map_err(|_| CryptoError::Encryption("failed to create AES-256-GCM key".into()))?;
    Ok(aead::LessSafeKey::new(unbound))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
