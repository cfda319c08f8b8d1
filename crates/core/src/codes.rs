//! Code alphabets, generation, and normalization.
//!
//! Location codes are what players type after the scratch/AR reveal; team
//! and invite codes travel over QR. All three share one unambiguous
//! uppercase alphanumeric alphabet.

use rand::Rng;

/// Characters usable in generated codes.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a location reveal code.
pub const LOCATION_CODE_LEN: usize = 6;

/// Length of a team code.
pub const TEAM_CODE_LEN: usize = 8;

/// Length of a team invite code.
pub const INVITE_CODE_LEN: usize = 10;

/// Generate a random code of `len` characters from [`CODE_ALPHABET`].
pub fn generate(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Generate a location reveal code.
pub fn generate_location_code() -> String {
    generate(LOCATION_CODE_LEN)
}

/// Generate a team code.
pub fn generate_team_code() -> String {
    generate(TEAM_CODE_LEN)
}

/// Generate a team invite code.
pub fn generate_invite_code() -> String {
    generate(INVITE_CODE_LEN)
}

/// Normalize user input before verification: trim whitespace, uppercase.
pub fn normalize(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

/// Whether `code` is exactly `len` characters from the code alphabet.
/// Expects already-normalized input.
pub fn is_valid_format(code: &str, len: usize) -> bool {
    code.len() == len && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}
