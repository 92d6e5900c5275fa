use actix_web::{web, HttpResponse};
use shared_types::{ApiResponse, LoginRequest};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::services::Backend;

pub async fn login(
    backend: web::Data<Backend>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let response = backend.users.login(&request).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(response).with_message("Login successful")))
}

pub async fn profile(
    backend: web::Data<Backend>,
    caller: Identity,
) -> Result<HttpResponse, ApiError> {
    let user = backend.users.profile(&caller).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}
