//! `coffre-crypto-core` — Pure cryptographic primitives for COFFRE.
//!
//! This crate is the audit target: zero network, zero async, zero storage
//! dependencies. It covers the key hierarchy (Argon2id wrap-key derivation,
//! VMK generation and wrapping), AES-256-GCM sealing, secret-wiping memory
//! types, and CSPRNG password generation.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod kdf;
pub mod symmetric;

pub mod vmk;

pub mod password;

pub use error::CryptoError;
pub use kdf::{derive_wrap_key, Argon2idParams, WRAP_KEY_LEN};
pub use memory::{disable_core_dumps, SecretBuffer, SecretBytes};
pub use password::{
    estimate_strength, generate, Strength, DEFAULT_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use symmetric::{open, seal, KEY_LEN, NONCE_LEN, TAG_LEN};
pub use vmk::VMK_LEN;
