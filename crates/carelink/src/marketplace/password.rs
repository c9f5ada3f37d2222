use std::fmt;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(String);

impl From<argon2::password_hash::Error> for PasswordError {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self(value.to_string())
    }
}

/// Argon2id digest of an account password, kept as a PHC string.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    phc: String,
}

impl PasswordDigest {
    pub fn create(password: &str) -> Result<Self, PasswordError> {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())?;
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(Self {
            phc: hash.to_string(),
        })
    }

    /// False for a wrong password and for a digest that no longer parses.
    pub fn verify(&self, candidate: &str) -> bool {
        PasswordHash::new(&self.phc).is_ok_and(|hash| {
            Argon2::default()
                .verify_password(candidate.as_bytes(), &hash)
                .is_ok()
        })
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_original_password() {
        let digest = PasswordDigest::create("correct horse").expect("hashes");
        assert!(digest.verify("correct horse"));
        assert!(!digest.verify("correct horse "));
        assert!(!digest.verify(""));
    }

    #[test]
    fn equal_passwords_get_distinct_salts() {
        let first = PasswordDigest::create("hunter22").expect("hashes");
        let second = PasswordDigest::create("hunter22").expect("hashes");
        assert_ne!(first, second);
        assert!(first.phc.starts_with("$argon2id$"));
        assert_eq!(format!("{first:?}"), "PasswordDigest(..)");
    }
}
