use crate::error::{ApiError, ApiResult};
use bcrypt::{hash, verify, DEFAULT_COST};

/// Bcrypt cost used for stored credentials
pub const BCRYPT_COST: u32 = DEFAULT_COST;

/// bcrypt only reads the first 72 bytes
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Hash a password on the blocking pool. `cost` overrides [`BCRYPT_COST`].
pub async fn hash_password(password: &str, cost: Option<u32>) -> ApiResult<String> {
    if password.is_empty() {
        return Err(ApiError::invalid_argument("Password cannot be empty"));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::invalid_argument(format!(
            "Password cannot be longer than {} bytes",
            MAX_PASSWORD_LENGTH
        )));
    }

    let password = password.to_string();
    let cost = cost.unwrap_or(BCRYPT_COST);

    tokio::task::spawn_blocking(move || {
        hash(password, cost).map_err(|e| ApiError::internal(format!("Password hashing failed: {}", e)))
    })
    .await?
}

/// Returns `Ok(false)` on mismatch. A malformed stored hash is also a mismatch.
pub async fn verify_password(password: &str, hashed: &str) -> ApiResult<bool> {
    let password = password.to_string();
    let hashed = hashed.to_string();

    let matched = tokio::task::spawn_blocking(move || match verify(password, &hashed) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::warn!("Stored password hash could not be verified: {}", e);
            false
        }
    })
    .await?;

    Ok(matched)
}
