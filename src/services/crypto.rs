use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

use crate::errors::ApiError;

// Пароли - bcrypt; refresh- и email-токены хранятся только дайджестом

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| ApiError::Internal(e.into()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

// SHA-256 в base64: токен в БД не лежит в открытом виде,
// сравнение идёт дайджест-к-дайджесту
pub fn sha256_base64(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    general_purpose::STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("s3cret").unwrap();
        assert_ne!(hash, "s3cret");
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn verify_tolerates_garbage_hash() {
        assert!(!verify_password("s3cret", "не bcrypt вовсе"));
    }

    #[test]
    fn sha256_digest_is_stable() {
        assert_eq!(
            sha256_base64("test"),
            "n4bQgYhMfWWaL+qgxVrQFaO/TxsrC4Is0V1sFbDwCgg="
        );
        assert_ne!(sha256_base64("a"), sha256_base64("b"));
    }
}
