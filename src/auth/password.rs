use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::AccountError;

/// Inputs beyond this are refused before reaching the hasher.
pub const MAX_PASSWORD_LEN: usize = 1024;

/// Argon2id with the crate's default (fixed) cost and a fresh random salt.
pub fn hash_password(plain: &[u8]) -> Result<String, AccountError> {
    if plain.len() > MAX_PASSWORD_LEN {
        return Err(AccountError::Credential(format!(
            "password exceeds {MAX_PASSWORD_LEN} bytes"
        )));
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain, &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            AccountError::Credential(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Checks `plain` against a stored PHC hash using the salt and params it carries.
pub fn verify_password(plain: &[u8], hash: &str) -> Result<bool, AccountError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        AccountError::Credential(e.to_string())
    })?;
    Ok(Argon2::default().verify_password(plain, &parsed).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = b"Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password(b"correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!verify_password(b"wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password(b"secret123").unwrap();
        let b = hash_password(b"secret123").unwrap();
        assert_ne!(a, b);
        assert!(verify_password(b"secret123", &a).unwrap());
        assert!(verify_password(b"secret123", &b).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password(b"anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, AccountError::Credential(_)));
    }

    #[test]
    fn oversized_password_is_a_credential_error() {
        let long = vec![b'a'; MAX_PASSWORD_LEN + 1];
        let err = hash_password(&long).unwrap_err();
        assert!(matches!(err, AccountError::Credential(_)));
    }
}
