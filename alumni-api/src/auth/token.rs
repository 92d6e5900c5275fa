use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::store::BackendKind;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared_types::{Role, UserAccount};

/// Claims carried by an access token.
///
/// `aud` names the backend that issued the token, so an identity minted
/// against one store cannot be replayed against the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
}

/// Issues and validates HS256 bearer tokens
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_hours: i64,
}

impl TokenService {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    pub fn issue(&self, user: &UserAccount, backend: BackendKind) -> ApiResult<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(self.expiry_hours);
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            aud: backend.as_str().to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("JWT encoding error: {}", e)))
    }

    pub fn verify(&self, token: &str, backend: BackendKind) -> ApiResult<Identity> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[backend.as_str()]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::unauthorized("Token expired"),
                ErrorKind::InvalidAudience => {
                    ApiError::unauthorized("Token was issued for a different backend")
                }
                _ => ApiError::unauthorized("Invalid token"),
            }
        })?;

        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(ApiError::unauthorized("Token is missing the user id"));
        }

        Ok(Identity {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind as ApiErrorKind;

    fn account(role: Role) -> UserAccount {
        UserAccount {
            id: "42".to_string(),
            username: "rina".to_string(),
            email: "rina@example.com".to_string(),
            password_hash: String::new(),
            role,
            created_at: 0,
            deleted_at: None,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = TokenService::new("test-secret", 1);
        let token = tokens.issue(&account(Role::Admin), BackendKind::Relational).unwrap();

        let identity = tokens.verify(&token, BackendKind::Relational).unwrap();
        assert_eq!(identity.user_id, "42");
        assert_eq!(identity.username, "rina");
        assert_eq!(identity.role, Role::Admin);
    }

    #[test]
    fn test_token_bound_to_issuing_backend() {
        let tokens = TokenService::new("test-secret", 1);
        let token = tokens.issue(&account(Role::User), BackendKind::Document).unwrap();

        let err = tokens.verify(&token, BackendKind::Relational).unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Unauthorized);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = TokenService::new("one", 1);
        let verifier = TokenService::new("two", 1);
        let token = issuer.issue(&account(Role::User), BackendKind::Document).unwrap();

        let err = verifier.verify(&token, BackendKind::Document).unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Unauthorized);
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = TokenService::new("test-secret", -2);
        let token = tokens.issue(&account(Role::User), BackendKind::Document).unwrap();

        let err = tokens.verify(&token, BackendKind::Document).unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Unauthorized);
        assert_eq!(err.message(), "Token expired");
    }
}
