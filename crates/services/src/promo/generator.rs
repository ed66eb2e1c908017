use rand::TryRngCore;
use rand::rngs::OsRng;

use super::error::PromoError;

pub const CODE_LENGTH: usize = 8;

/// Canonical code alphabet: A-Z without `I`/`O`, digits 2-9.
///
/// The generator emits only these characters and the validator's format
/// check accepts only these characters.
pub const CODE_ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const RAW_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const AMBIGUOUS: &[u8] = b"0O1Il";
// Largest multiple of 36 that fits in a byte; higher bytes are discarded.
const ACCEPT_BELOW: u8 = 252;

/// Draws a fresh code from the operating system's CSPRNG.
pub fn generate_code() -> Result<String, PromoError> {
    generate_code_with(&mut OsRng)
}

/// Rejection-samples random bytes onto the raw alphanumeric set, strips the
/// ambiguous glyphs, and keeps drawing until `CODE_LENGTH` characters
/// have accumulated.
pub fn generate_code_with<R: TryRngCore + ?Sized>(rng: &mut R) -> Result<String, PromoError> {
    let mut code = String::with_capacity(CODE_LENGTH);
    let mut buf = [0u8; 16];

    while code.len() < CODE_LENGTH {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| PromoError::Generation(e.to_string()))?;

        for &byte in buf.iter().filter(|b| **b < ACCEPT_BELOW) {
            let c = RAW_ALPHABET[usize::from(byte % 36)];
            if AMBIGUOUS.contains(&c) {
                continue;
            }
            code.push(char::from(c));
            if code.len() == CODE_LENGTH {
                break;
            }
        }
    }

    Ok(code)
}

/// Trims and uppercases user input before any other check.
pub fn normalize_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

pub fn is_valid_format(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.as_bytes().contains(&b))
}
