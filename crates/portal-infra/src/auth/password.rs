//! Argon2 password hashing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use portal_core::ports::{AuthError, PasswordService};

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Default)]
pub struct Argon2PasswordService {
    argon2: Argon2<'static>,
}

impl Argon2PasswordService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordService for Argon2PasswordService {
    fn check_policy(&self, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::WeakPassword(format!(
                "must be at least {} characters",
                MIN_PASSWORD_CHARS
            )));
        }
        if password.chars().all(|c| c.is_ascii_digit()) {
            return Err(AuthError::WeakPassword("must not be entirely numeric".into()));
        }
        Ok(())
    }

    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::HashingError(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| AuthError::HashingError(e.to_string()))?;

        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let service = Argon2PasswordService::new();
        let hash = service.hash("correct horse").unwrap();

        assert!(service.verify("correct horse", &hash).unwrap());
        assert!(!service.verify("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_policy() {
        let service = Argon2PasswordService::new();
        assert!(service.check_policy("short").is_err());
        assert!(service.check_policy("12345678").is_err());
        assert!(service.check_policy("long enough").is_ok());
    }
}
