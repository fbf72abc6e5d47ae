//! Password hashing
//!
//! bcrypt with a configurable cost. Hashing and verification are CPU bound
//! and run on the blocking thread pool.

use crate::error::AppError;

/// Hash `password` with bcrypt at `cost`
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to hash password: {e}")))
}

/// Check `password` against a stored bcrypt hash
///
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    match verified {
        Ok(matches) => Ok(matches),
        Err(error) => {
            tracing::warn!(%error, "stored password hash could not be parsed");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_is_salted_and_verifies() {
        let first = hash_password("secret1".to_string(), 4).await.unwrap();
        let second = hash_password("secret1".to_string(), 4).await.unwrap();
        assert_ne!(first, second);
        assert_ne!(first, "secret1");

        assert!(verify_password("secret1".to_string(), first.clone()).await.unwrap());
        assert!(!verify_password("wrong".to_string(), first).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_a_mismatch() {
        assert!(
            !verify_password("secret1".to_string(), "not-a-bcrypt-hash".to_string())
                .await
                .unwrap()
        );
    }
}
