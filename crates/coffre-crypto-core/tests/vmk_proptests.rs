#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for VMK wrapping.
//!
//! Verifies the algebraic invariant behind login:
//! `∀ vmk, wk: unwrap(wk, wrap(wk, vmk)) == vmk`

use coffre_crypto_core::memory::SecretBytes;
use coffre_crypto_core::{vmk, CryptoError};
use proptest::prelude::*;

proptest! {
    /// Unwrapping a freshly wrapped VMK with the same wrap key recovers the
    /// original VMK.
    #[test]
    fn wrap_unwrap_roundtrip(
        vmk_bytes in proptest::array::uniform32(0u8..),
        wrap_key in proptest::array::uniform32(0u8..),
    ) {
        let key = SecretBytes::new(vmk_bytes);
        let wrapped = vmk::wrap(&wrap_key, &key).expect("wrap should succeed");
        let unwrapped = vmk::unwrap(&wrap_key, &wrapped)
            .expect("unwrap should succeed with correct wrap key");
        prop_assert_eq!(unwrapped.expose(), &vmk_bytes);
    }

    /// Unwrapping with a different wrap key always fails closed, never
    /// returns wrong bytes.
    #[test]
    fn wrong_key_always_fails(
        vmk_bytes in proptest::array::uniform32(0u8..),
        wrap_key in proptest::array::uniform32(0u8..),
        wrong_key in proptest::array::uniform32(0u8..),
    ) {
        prop_assume!(wrap_key != wrong_key);
        let key = SecretBytes::new(vmk_bytes);
        let wrapped = vmk::wrap(&wrap_key, &key).expect("wrap should succeed");
        let result = vmk::unwrap(&wrong_key, &wrapped);
        prop_assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    /// Flipping any single byte of the wrapped blob breaks authentication.
    #[test]
    fn any_bitflip_fails(
        vmk_bytes in proptest::array::uniform32(0u8..),
        wrap_key in proptest::array::uniform32(0u8..),
        flip_index in 0usize..60,
    ) {
        let key = SecretBytes::new(vmk_bytes);
        let mut wrapped = vmk::wrap(&wrap_key, &key).expect("wrap should succeed");
        let idx = flip_index % wrapped.len();
        wrapped[idx] ^= 0x01;
        let result = vmk::unwrap(&wrap_key, &wrapped);
        prop_assert!(matches!(result, Err(CryptoError::Decryption)));
    }
}
