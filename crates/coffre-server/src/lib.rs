//! `coffre-server` — Thin REST layer for COFFRE.
//!
//! Exposes each core operation as a route and maps error kinds to status
//! codes. Request bodies pass through opaque; all cryptographic and
//! decision logic lives in `coffre-vault` / `coffre-crypto-core`.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{app, serve, ServerConfig};
