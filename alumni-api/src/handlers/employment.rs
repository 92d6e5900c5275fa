use actix_web::{web, HttpResponse};
use shared_types::{ApiResponse, CreateEmploymentRequest, UpdateEmploymentRequest};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::query::{ListParams, ListQuery, EMPLOYMENT_SORT};
use crate::services::Backend;

pub async fn create_employment(
    backend: web::Data<Backend>,
    caller: Identity,
    request: web::Json<CreateEmploymentRequest>,
) -> Result<HttpResponse, ApiError> {
    let record = backend.employment.create(&caller, &request).await?;
    Ok(HttpResponse::Created()
        .json(ApiResponse::ok(record).with_message("Employment record created")))
}

pub async fn list_employment(
    backend: web::Data<Backend>,
    caller: Identity,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let params = ListParams::resolve(&query, &EMPLOYMENT_SORT);
    let page = backend.employment.list(&caller, &params).await?;
    Ok(HttpResponse::Ok().json(page.into_response(&params)))
}

pub async fn get_employment(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let record = backend.employment.get(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(record)))
}

pub async fn list_by_alumni(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let records = backend.employment.list_by_alumni(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(records)))
}

pub async fn update_employment(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
    request: web::Json<UpdateEmploymentRequest>,
) -> Result<HttpResponse, ApiError> {
    let record = backend.employment.update(&caller, &path, &request).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(record).with_message("Employment record updated")))
}

pub async fn soft_delete_employment(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    backend.employment.soft_delete(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Employment record moved to trash")))
}

pub async fn restore_employment(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    backend.employment.restore(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Employment record restored")))
}

pub async fn list_trash(
    backend: web::Data<Backend>,
    caller: Identity,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let params = ListParams::resolve(&query, &EMPLOYMENT_SORT);
    let page = backend.employment.list_trash(&caller, &params).await?;
    Ok(HttpResponse::Ok().json(page.into_response(&params)))
}

pub async fn get_trashed(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let record = backend.employment.get_trashed(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(record)))
}

pub async fn hard_delete_employment(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    backend.employment.purge(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Employment record permanently deleted")))
}
