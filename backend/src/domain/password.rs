//! Password hashing with Argon2id.
//!
//! Hashes are stored as PHC strings, so the parameters used to create a hash
//! travel with it and verification keeps working after a cost change.

use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

use crate::domain::Error;

/// Argon2id hasher shared by authentication and account services.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl PasswordHasher {
    /// Hasher with explicit cost parameters.
    ///
    /// # Errors
    /// Returns [`Error::internal`] when the parameters are rejected by Argon2.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, Error> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|err| Error::internal(format!("invalid argon2 parameters: {err}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Cheapest parameters Argon2 accepts. Only for tests.
    #[cfg(any(test, feature = "test-support"))]
    pub fn insecure_fast() -> Self {
        match Self::with_cost(8, 1) {
            Ok(hasher) => hasher,
            Err(err) => panic!("minimal argon2 parameters must be valid: {err}"),
        }
    }

    /// Hash a plaintext password into a PHC string.
    ///
    /// # Examples
    /// ```
    /// use tracker_backend::domain::PasswordHasher;
    ///
    /// let hasher = PasswordHasher::default();
    /// let hash = hasher.hash("correct horse").expect("hash");
    /// assert!(hasher.verify("correct horse", &hash));
    /// assert!(!hasher.verify("battery staple", &hash));
    /// ```
    pub fn hash(&self, password: &str) -> Result<String, Error> {
        let mut salt_bytes = [0_u8; 16];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|err| Error::internal(format!("failed to encode salt: {err}")))?;
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| Error::internal(format!("failed to hash password: {err}")))
    }

    /// Check a plaintext password against a stored PHC string.
    ///
    /// Malformed hashes never verify.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(err) => {
                tracing::warn!(error = %err, "stored password hash is malformed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn hashes_are_salted() {
        let hasher = PasswordHasher::insecure_fast();
        let first = hasher.hash("secret-password").expect("hash");
        let second = hasher.hash("secret-password").expect("hash");
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
    }

    #[rstest]
    fn verify_accepts_only_the_original_password() {
        let hasher = PasswordHasher::insecure_fast();
        let hash = hasher.hash("secret-password").expect("hash");
        assert!(hasher.verify("secret-password", &hash));
        assert!(!hasher.verify("other-password", &hash));
    }

    #[rstest]
    fn verify_rejects_malformed_hashes() {
        let hasher = PasswordHasher::insecure_fast();
        assert!(!hasher.verify("secret", "plaintext"));
    }

    #[rstest]
    fn hashes_from_other_costs_still_verify() {
        let strong = PasswordHasher::with_cost(16, 2).expect("params");
        let hash = strong.hash("secret-password").expect("hash");
        assert!(PasswordHasher::insecure_fast().verify("secret-password", &hash));
    }
}
