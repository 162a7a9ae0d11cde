use anyhow::{Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Hash a password into an Argon2id PHC string (`$argon2id$v=19$m=...$<salt>$<hash>`).
/// The salt and parameters travel inside the stored value.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

/// A stored value that is not a PHC string never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let stored = hash_password("p").unwrap();
        assert!(verify_password("p", &stored));
        assert!(!verify_password("P", &stored));
        assert!(!verify_password("", &stored));
    }

    #[test]
    fn test_stored_value_is_argon2id_phc() {
        let stored = hash_password("secret").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(!stored.contains("secret"));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_malformed_stored_value_never_verifies() {
        assert!(!verify_password("p", "p"));
        assert!(!verify_password("p", "zz$abc"));
        assert!(!verify_password("p", ""));
    }
}
