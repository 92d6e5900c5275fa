//! HTTP handlers. Each one extracts the caller and request data, calls one
//! service method on the backend mounted for its scope, and wraps the result
//! in the shared response envelope.

pub mod alumni;
pub mod auth;
pub mod employment;
pub mod files;
pub mod health;
pub mod users;
