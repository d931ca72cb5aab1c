//! Session/lock state machine and the per-session credential cipher.
//!
//! A single session at a time: `locked` gates every credential operation,
//! `current_user` names the authenticated account, and the cipher is the
//! live AES-256-GCM key built from the unwrapped VMK. Logout and lock
//! clear all three together.
//!
//! The cipher is handed out as an `Arc` snapshot: an operation grabs its
//! reference once at the start, and a concurrent lock/logout only clears
//! the shared slot — in-flight holders keep the key alive (and zeroized
//! on the last drop) until they finish.

use std::sync::Arc;

use coffre_crypto_core::memory::{SecretBuffer, SecretBytes};
use coffre_crypto_core::vmk::VMK_LEN;
use coffre_crypto_core::{symmetric, CryptoError};

use crate::error::VaultError;

/// AAD tag binding credential ciphertexts to this context, distinct from
/// the VMK-wrapping tag.
const CREDENTIAL_AAD: &[u8] = b"coffre-credential-v1";

// ---------------------------------------------------------------------------
// SessionCipher
// ---------------------------------------------------------------------------

/// The live symmetric cipher for an authenticated session.
///
/// Wraps the unwrapped VMK; the key is zeroized when the last reference
/// drops.
pub struct SessionCipher {
    key: SecretBytes<VMK_LEN>,
}

impl SessionCipher {
    /// Build the session cipher from a freshly unwrapped VMK.
    #[must_use]
    pub fn new(master_key: SecretBytes<VMK_LEN>) -> Self {
        Self { key: master_key }
    }

    /// Encrypt a plaintext password for storage.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Crypto`] if the seal fails.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        Ok(symmetric::seal(plaintext, self.key.expose(), CREDENTIAL_AAD)?)
    }

    /// Decrypt a stored ciphertext.
    ///
    /// Failure here is routine — it is how rows belonging to another
    /// account's VMK announce themselves — so the raw [`CryptoError`] is
    /// returned for the caller to downgrade to skip/`NotFound`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decryption`] if the blob does not
    /// authenticate under this session's key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<SecretBuffer, CryptoError> {
        symmetric::open(ciphertext, self.key.expose(), CREDENTIAL_AAD)
    }

    /// Expose the VMK for re-wrapping during master password rotation.
    #[must_use]
    pub(crate) const fn master_key(&self) -> &SecretBytes<VMK_LEN> {
        &self.key
    }
}

impl std::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCipher(***)")
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Mutable session state. The facade guards this behind a mutex; every
/// transition below is atomic under that lock.
#[derive(Debug)]
pub struct SessionState {
    locked: bool,
    current_user: Option<String>,
    cipher: Option<Arc<SessionCipher>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Initial state: locked, nobody logged in.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locked: true,
            current_user: None,
            cipher: None,
        }
    }

    /// Successful login: unlock and install the user's cipher.
    pub fn open_session(&mut self, username: &str, master_key: SecretBytes<VMK_LEN>) {
        self.locked = false;
        self.current_user = Some(username.to_owned());
        self.cipher = Some(Arc::new(SessionCipher::new(master_key)));
    }

    /// Lock or logout: clear everything at once. In-flight operations that
    /// already snapshotted the cipher finish on their own copy.
    pub fn close_session(&mut self) {
        self.locked = true;
        self.current_user = None;
        self.cipher = None;
    }

    /// Clear the lock flag without a login. Leaves no cipher in place, so
    /// credential operations still fail — with `Unauthenticated` rather
    /// than `VaultLocked`.
    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Whether the vault is locked.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// The logged-in username, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    /// Snapshot the session cipher for one operation.
    ///
    /// # Errors
    ///
    /// - [`VaultError::VaultLocked`] if the vault is locked
    /// - [`VaultError::Unauthenticated`] if unlocked but nobody logged in
    pub fn cipher(&self) -> Result<Arc<SessionCipher>, VaultError> {
        if self.locked {
            return Err(VaultError::VaultLocked);
        }
        self.cipher.clone().ok_or(VaultError::Unauthenticated)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
