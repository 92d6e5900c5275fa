//! Caller identity for every protected route.
//!
//! `Identity` is an actix extractor: it reads the bearer token, validates it
//! against the backend mounted on the current scope, and rejects the request
//! with `Unauthorized` before the handler runs.

pub mod password;
pub mod token;

use crate::error::{ApiError, ApiResult};
use crate::services::Backend;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use shared_types::Role;
use std::future::{ready, Ready};

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenService};

/// Authenticated caller, produced only by a valid token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl FromRequest for Identity {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(identify(req))
    }
}

fn identify(req: &HttpRequest) -> ApiResult<Identity> {
    let backend = req
        .app_data::<web::Data<Backend>>()
        .ok_or_else(|| ApiError::internal("No backend configured for this route"))?;

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Access token required"))?
        .to_str()
        .map_err(|_| {
            ApiError::unauthorized("Authorization header contains invalid characters")
        })?;

    let token = bearer_token(header)?;
    backend.tokens.verify(token, backend.kind)
}

fn bearer_token(header: &str) -> ApiResult<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Invalid token format, use 'Bearer <token>'"))?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def").unwrap(), "abc.def");
        assert_eq!(bearer_token("Bearer   abc  ").unwrap(), "abc");
        assert!(bearer_token("Bearer ").is_err());
        assert!(bearer_token("Basic dXNlcjpwYXNz").is_err());
        assert!(bearer_token("abc.def").is_err());
    }
}
