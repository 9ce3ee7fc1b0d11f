//! Argon2id password hashing, stored as PHC strings.
//!
//! Hashing is CPU-bound, so request handlers go through the `*_blocking`
//! wrappers which run it on tokio's blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;

use crate::errors::AppError;

/// Verified against when the email is unknown, so a miss costs the same
/// as a wrong password.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("not-a-real-account-0").ok());

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

/// Returns false for malformed hashes rather than erroring.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(encoded) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("hashing task failed: {e}")))?
}

/// `encoded` is `None` when no account matched; the dummy hash is checked
/// instead and the result is always false.
pub async fn verify_password_blocking(
    password: String,
    encoded: Option<String>,
) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || match encoded {
        Some(encoded) => verify_password(&password, &encoded),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                verify_password(&password, dummy);
            }
            false
        }
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("verify task failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_hash_then_verify() {
        let encoded = hash_password("correct horse 42").unwrap();
        assert!(encoded.starts_with("$argon2id$"));
        assert!(verify_password("correct horse 42", &encoded));
        assert!(!verify_password("correct horse 43", &encoded));
    }

    #[test]
    fn test_salts_differ_per_hash() {
        assert_ne!(
            hash_password("same-pass1").unwrap(),
            hash_password("same-pass1").unwrap()
        );
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "$argon2id$garbage"));
        assert!(!verify_password("x", "sha256$1$00$00"));
    }

    #[tokio::test]
    async fn test_unknown_account_still_runs_a_verify() {
        assert!(DUMMY_HASH.is_some());
        assert!(!verify_password_blocking("not-a-real-account-0".into(), None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_blocking_wrappers_round_trip() {
        let encoded = hash_password_blocking("hunter22a".into()).await.unwrap();
        assert!(verify_password_blocking("hunter22a".into(), Some(encoded.clone()))
            .await
            .unwrap());
        assert!(!verify_password_blocking("hunter22b".into(), Some(encoded))
            .await
            .unwrap());
    }

    // Single-threaded runtime: the timer task can only finish while the
    // hash is in flight if hashing happens off the runtime thread.
    #[tokio::test(flavor = "current_thread")]
    async fn test_hashing_leaves_the_runtime_free() {
        let timer = tokio::spawn(tokio::time::sleep(Duration::from_millis(1)));
        hash_password_blocking("hunter22a".into()).await.unwrap();
        assert!(timer.is_finished());
    }
}
