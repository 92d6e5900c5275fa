use actix_web::{web, HttpResponse};
use shared_types::ApiResponse;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::query::{ListParams, ListQuery, USER_SORT};
use crate::services::Backend;

pub async fn list_users(
    backend: web::Data<Backend>,
    caller: Identity,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let params = ListParams::resolve(&query, &USER_SORT);
    let page = backend.users.list(&caller, &params).await?;
    Ok(HttpResponse::Ok().json(page.into_response(&params)))
}

pub async fn get_user(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user = backend.users.get(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}

pub async fn delete_user(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    backend.users.delete(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("User deleted")))
}
