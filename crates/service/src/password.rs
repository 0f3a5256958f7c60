//! Password hashing and policy

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::{FieldError, Result, ServiceError};

/// Argon2 memory cost in KiB; the time cost comes from configuration.
const MEMORY_KIB: u32 = 19_456;

fn hasher(time_cost: u32) -> Result<Argon2<'static>> {
    let params = Params::new(MEMORY_KIB, time_cost.max(1), 1, None)
        .map_err(|e| ServiceError::internal(format!("argon2 params: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Derives the stored credential hash (PHC string) from a password.
pub fn hash_password(password: &str, time_cost: u32) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher(time_cost)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::internal(format!("password hashing: {e}")))?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC string. Any parse or verify
/// failure is just `false`; the caller folds it into the single
/// invalid-credentials error.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Registration password policy: at least 8 characters with an upper, a
/// lower and a digit.
pub fn validate_password_policy(password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if password.chars().count() < 8 {
        errors.push(FieldError::new(
            "password",
            "must be at least 8 characters",
        ));
    }
    if !password.chars().any(char::is_uppercase) {
        errors.push(FieldError::new(
            "password",
            "must contain an uppercase letter",
        ));
    }
    if !password.chars().any(char::is_lowercase) {
        errors.push(FieldError::new(
            "password",
            "must contain a lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new("password", "must contain a digit"));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("Passw0rd!", 1).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Passw0rd!", &hash));
        assert!(!verify_password("Passw0rd?", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("Passw0rd!", 1).unwrap();
        let b = hash_password("Passw0rd!", 1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_stored_hash_verifies_false() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[rstest]
    #[case("Passw0rd", true)]
    #[case("Sh0rtPw", false)] // 7 chars
    #[case("passw0rd", false)] // no upper
    #[case("PASSW0RD", false)] // no lower
    #[case("Password", false)] // no digit
    fn policy_boundaries(#[case] password: &str, #[case] ok: bool) {
        assert_eq!(validate_password_policy(password).is_empty(), ok);
    }
}
