use actix_web::{web, HttpResponse};
use serde::Deserialize;
use shared_types::{ApiResponse, CreateAlumniRequest, UpdateAlumniRequest};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::query::{ListParams, ListQuery, ALUMNI_SORT};
use crate::services::Backend;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub min_salary: Option<i64>,
}

pub async fn list_alumni(
    backend: web::Data<Backend>,
    caller: Identity,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let params = ListParams::resolve(&query, &ALUMNI_SORT);
    let page = backend.alumni.list(&caller, &params).await?;
    Ok(HttpResponse::Ok().json(page.into_response(&params)))
}

pub async fn get_alumni(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let record = backend.alumni.get(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(record)))
}

pub async fn create_alumni(
    backend: web::Data<Backend>,
    caller: Identity,
    request: web::Json<CreateAlumniRequest>,
) -> Result<HttpResponse, ApiError> {
    let record = backend.alumni.create(&caller, &request).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(record).with_message("Alumni created")))
}

pub async fn update_alumni(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
    request: web::Json<UpdateAlumniRequest>,
) -> Result<HttpResponse, ApiError> {
    let record = backend.alumni.update(&caller, &path, &request).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(record).with_message("Alumni updated")))
}

pub async fn delete_alumni(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    backend.alumni.delete(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Alumni soft-deleted")))
}

pub async fn graduation_year_report(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<i32>,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, ApiError> {
    let report = backend
        .alumni
        .graduation_year_report(&caller, path.into_inner(), query.min_salary)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(report)))
}
