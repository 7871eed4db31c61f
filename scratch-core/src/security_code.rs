//! Security Codes
//!
//! 16-character public ticket identifiers used for anti-counterfeit checks.
//! The alphabet leaves out `0`, `O`, `1` and `I`, giving 32 symbols and a
//! 32^16 keyspace.

use rand::rngs::OsRng;
use rand::Rng;

use crate::error::{CoreError, CoreResult};

/// Code length
pub const SECURITY_CODE_LEN: usize = 16;

/// Unambiguous alphabet
pub const SECURITY_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Attempts before giving up on finding an unused code
pub const MAX_GENERATION_ATTEMPTS: u32 = 10;

/// Draw a code from the OS RNG
pub fn generate() -> String {
    generate_with(&mut OsRng)
}

/// Draw a code from `rng`
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SECURITY_CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..SECURITY_CODE_ALPHABET.len());
            SECURITY_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a code that `exists` reports as unused
///
/// Tries at most `attempts` times. Running out means the generator or the
/// store is broken, not that the keyspace is full.
pub fn generate_unique<E, F>(attempts: u32, mut exists: F) -> Result<String, E>
where
    E: From<CoreError>,
    F: FnMut(&str) -> Result<bool, E>,
{
    for attempt in 1..=attempts {
        let code = generate();
        if !exists(&code)? {
            return Ok(code);
        }
        tracing::warn!(attempt, "security code collision, retrying");
    }
    Err(CoreError::SecurityCodeExhausted { attempts }.into())
}

/// Normalize user input and check the format
///
/// Whitespace and `-` group separators are ignored and lowercase is accepted.
pub fn normalize(code: &str) -> CoreResult<String> {
    let code: String = code
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    if code.chars().count() != SECURITY_CODE_LEN {
        return Err(CoreError::InvalidFormat(format!(
            "expected {} characters, got {}",
            SECURITY_CODE_LEN,
            code.chars().count()
        )));
    }
    if let Some(bad) = code.bytes().find(|b| !SECURITY_CODE_ALPHABET.contains(b)) {
        return Err(CoreError::InvalidFormat(format!(
            "character {:?} not allowed",
            bad as char
        )));
    }
    Ok(code)
}

/// Short prefix safe to put in logs
pub fn log_prefix(code: &str) -> &str {
    code.get(..4).unwrap_or(code)
}
