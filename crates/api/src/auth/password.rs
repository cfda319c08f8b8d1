//! Operator password hashing and policy.
//!
//! Hashes are Argon2id in PHC string form, so parameters and salt travel
//! with the hash and can be rotated without a schema change. The policy
//! check lives here too: there is exactly one password-holding account
//! type (operators), so the rules are not configurable per call site.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Minimum length for operator passwords.
pub const MIN_OPERATOR_PASSWORD_LEN: usize = 12;

/// Hash an operator password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a login attempt against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; `Err` is reserved for malformed hashes and
/// other non-password failures so callers can tell "wrong password" apart
/// from "corrupt row".
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Enforce the operator password policy on a new password.
pub fn validate_operator_password(password: &str) -> Result<(), String> {
    if password.len() < MIN_OPERATOR_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_OPERATOR_PASSWORD_LEN} characters long"
        ));
    }
    Ok(())
}
