use actix_web::http::header::{
    ContentDisposition, DispositionParam, DispositionType, CONTENT_TYPE,
};
use actix_web::{web, HttpRequest, HttpResponse};
use shared_types::{ApiResponse, UploadFileParams};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::query::{ListParams, ListQuery, FILE_SORT};
use crate::services::Backend;

/// Raw request body; file metadata travels in the query string
pub async fn upload_file(
    backend: web::Data<Backend>,
    caller: Identity,
    req: HttpRequest,
    params: web::Query<UploadFileParams>,
    body: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let limit = backend.files.max_body_bytes();
    let bytes = body
        .to_bytes_limited(limit)
        .await
        .map_err(|e| ApiError::invalid_argument(format!("Failed to read upload: {}", e)))?
        .map_err(|_| ApiError::invalid_argument(format!("File exceeds {} bytes", limit)))?;

    let file = backend
        .files
        .upload(&caller, &params, &content_type, &bytes)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(file).with_message("File uploaded")))
}

pub async fn list_files(
    backend: web::Data<Backend>,
    caller: Identity,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let params = ListParams::resolve(&query, &FILE_SORT);
    let page = backend.files.list(&caller, &params).await?;
    Ok(HttpResponse::Ok().json(page.into_response(&params)))
}

pub async fn get_file(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let file = backend.files.get(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(file)))
}

pub async fn open_file(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let (file, bytes) = backend.files.open(&caller, &path).await?;
    Ok(HttpResponse::Ok()
        .content_type(file.content_type.as_str())
        .insert_header(ContentDisposition {
            disposition: DispositionType::Inline,
            parameters: vec![DispositionParam::Filename(file.original_name)],
        })
        .body(bytes))
}

pub async fn delete_file(
    backend: web::Data<Backend>,
    caller: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    backend.files.delete(&caller, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("File deleted")))
}
