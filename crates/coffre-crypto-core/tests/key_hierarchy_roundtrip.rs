#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! End-to-end key hierarchy test: master password → Argon2id wrap key →
//! wrapped VMK → session key, the exact path a login takes.

use coffre_crypto_core::kdf::{derive_wrap_key, Argon2idParams};
use coffre_crypto_core::{symmetric, vmk, CryptoError};

/// Small params so the suite stays fast.
const TEST_PARAMS: Argon2idParams = Argon2idParams {
    t_cost: 1,
    m_cost: 32,
    p_cost: 1,
    output_len: 32,
    version: 0x13,
};

const SALT: &[u8; 16] = b"fixed_salt_16byt";

#[test]
fn full_hierarchy_roundtrip() {
    let master_password = b"CorrectHorseBatteryStaple";

    // Account creation path.
    let wrap_key = derive_wrap_key(master_password, SALT, &TEST_PARAMS).expect("derive");
    let master_key = vmk::generate().expect("generate");
    let wrapped = vmk::wrap(wrap_key.expose(), &master_key).expect("wrap");

    // Login path: re-derive from the same password and unwrap.
    let wrap_key_again = derive_wrap_key(master_password, SALT, &TEST_PARAMS).expect("derive");
    let recovered = vmk::unwrap(wrap_key_again.expose(), &wrapped).expect("unwrap");
    assert_eq!(recovered.expose(), master_key.expose());

    // The recovered VMK decrypts data sealed under the original.
    let blob = symmetric::seal(b"Tr0ub4dor&3", master_key.expose(), b"test-aad").expect("seal");
    let plaintext = symmetric::open(&blob, recovered.expose(), b"test-aad").expect("open");
    assert_eq!(plaintext.expose(), b"Tr0ub4dor&3");
}

#[test]
fn wrong_master_password_is_rejected_at_unwrap() {
    let wrap_key = derive_wrap_key(b"right password", SALT, &TEST_PARAMS).expect("derive");
    let master_key = vmk::generate().expect("generate");
    let wrapped = vmk::wrap(wrap_key.expose(), &master_key).expect("wrap");

    let wrong_key = derive_wrap_key(b"wrong password", SALT, &TEST_PARAMS).expect("derive");
    let result = vmk::unwrap(wrong_key.expose(), &wrapped);
    assert!(matches!(result, Err(CryptoError::Decryption)));
}

#[test]
fn two_accounts_wrap_distinct_vmks() {
    // Same master password, different salts: distinct wrap keys, and the
    // VMKs themselves are independent random keys.
    let vmk_a = vmk::generate().expect("generate");
    let vmk_b = vmk::generate().expect("generate");
    assert_ne!(vmk_a.expose(), vmk_b.expose());

    // Identical plaintext under each VMK yields distinct ciphertexts.
    let ct_a = symmetric::seal(b"shared-password", vmk_a.expose(), &[]).expect("seal");
    let ct_b = symmetric::seal(b"shared-password", vmk_b.expose(), &[]).expect("seal");
    assert_ne!(ct_a, ct_b);

    // And neither decrypts under the other's key.
    assert!(symmetric::open(&ct_a, vmk_b.expose(), &[]).is_err());
    assert!(symmetric::open(&ct_b, vmk_a.expose(), &[]).is_err());
}
