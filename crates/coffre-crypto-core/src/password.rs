//! Cryptographic password generation and strength estimation.
//!
//! Generation uses `OsRng` (OS-level CSPRNG) for every character pick — a
//! general-purpose PRNG is never acceptable here. The strength estimate is
//! informational only: it gates no generation or storage decision.

use rand::Rng;

use crate::error::CryptoError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum allowed password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum allowed password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Default password length.
pub const DEFAULT_PASSWORD_LENGTH: usize = 16;

/// The generation alphabet: mixed-case letters, digits, and the
/// shifted-number-row symbols.
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()";

/// Symbols reachable as shift+digit on a US keyboard, treated as their own
/// character class by the strength estimate.
const SHIFT_SYMBOLS: &str = "!@#$%^&*()";

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generate a random password of `length` characters.
///
/// Each position is drawn uniformly from [`ALPHABET`] using `OsRng`. There
/// is no must-contain-one-of-each-class rule — uniform picks keep every
/// password equally likely.
///
/// # Errors
///
/// Returns [`CryptoError::PasswordGeneration`] if `length` is outside
/// [`MIN_PASSWORD_LENGTH`]`..=`[`MAX_PASSWORD_LENGTH`].
pub fn generate(length: usize) -> Result<String, CryptoError> {
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        return Err(CryptoError::PasswordGeneration(format!(
            "length must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH}, got {length}"
        )));
    }

    let mut rng = rand::rngs::OsRng;
    let password: String = (0..length)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect();
    Ok(password)
}

// ---------------------------------------------------------------------------
// Strength estimate
// ---------------------------------------------------------------------------

/// Informational strength tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Weak,
    Medium,
    Strong,
}

impl Strength {
    /// Human-readable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        }
    }
}

/// Estimate password strength from a naive entropy model.
///
/// The character-set size is the sum of the detected classes (lowercase 26,
/// uppercase 26, digits 10, shift-row symbols 10, anything else a flat 20),
/// and entropy is `length * log2(set size)` bits. Thresholds: strong at
/// >= 80 bits, medium above 40, weak otherwise.
#[must_use]
#[allow(clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
pub fn estimate_strength(password: &str) -> Strength {
    if password.is_empty() {
        return Strength::Weak;
    }

    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digits = password.chars().any(|c| c.is_ascii_digit());
    let has_shift_symbols = password.chars().any(|c| SHIFT_SYMBOLS.contains(c));
    let has_other_symbols = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !SHIFT_SYMBOLS.contains(c));

    let mut char_set_size: u32 = 0;
    if has_lowercase {
        char_set_size += 26;
    }
    if has_uppercase {
        char_set_size += 26;
    }
    if has_digits {
        char_set_size += 10;
    }
    if has_shift_symbols {
        char_set_size += 10;
    }
    if has_other_symbols {
        // Flat allowance for the ~20-30 remaining common symbols.
        char_set_size += 20;
    }

    let entropy = password.chars().count() as f64 * f64::from(char_set_size).log2();

    if entropy >= 80.0 {
        Strength::Strong
    } else if entropy > 40.0 {
        Strength::Medium
    } else {
        Strength::Weak
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
