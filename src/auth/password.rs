use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::error::AppError;

pub const MIN_LENGTH: usize = 8;

/// Reject passwords shorter than `MIN_LENGTH` or made only of digits.
pub fn validate(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_LENGTH {
        return Err(AppError::validation(
            "password",
            "password_too_short",
            format!("Password must be at least {MIN_LENGTH} characters"),
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::validation(
            "password",
            "password_entirely_numeric",
            "Password cannot be entirely numeric",
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id (19MB memory, 2 iterations, parallelism 1).
pub fn hash(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params::new(19 * 1024, 2, 1, None).map_err(|e| format!("Invalid params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| format!("Hashing failed: {e}"))
}

pub fn verify(password: &str, hash: &str) -> Result<bool, String> {
    let parsed = PasswordHash::new(hash).map_err(|e| format!("Invalid hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy() {
        assert!(validate("short").is_err());
        assert!(validate("12345678").is_err());
        assert!(validate("correct horse").is_ok());
    }

    #[test]
    fn hash_then_verify() {
        let hashed = hash("correct horse").unwrap();
        assert!(verify("correct horse", &hashed).unwrap());
        assert!(!verify("battery staple", &hashed).unwrap());
    }
}
