//! Route table. Both backends mount the same surface under their own prefix;
//! the scope's `Data<Backend>` decides which stores a request reaches.

use actix_web::{web, Scope};

use crate::error::ApiError;
use crate::handlers::{alumni, auth, employment, files, health, users};
use crate::services::{Backend, Backends};

/// Extractor failures answer with the same envelope as every other error
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::invalid_argument(format!("Invalid request body: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::invalid_argument(format!("Invalid query string: {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        ApiError::invalid_argument(format!("Invalid path parameter: {}", err)).into()
    }));
}

pub fn configure(backends: Backends) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        extractor_configs(cfg);
        cfg.app_data(web::Data::new(backends.clone()))
            .route("/health", web::get().to(health::health))
            .service(backend_scope(backends.relational))
            .service(backend_scope(backends.document));
    }
}

fn backend_scope(backend: Backend) -> Scope {
    web::scope(backend.kind.prefix())
        .app_data(web::Data::new(backend))
        .route("/login", web::post().to(auth::login))
        .route("/profile", web::get().to(auth::profile))
        .route("/users", web::get().to(users::list_users))
        .route("/users/{id}", web::get().to(users::get_user))
        .route("/users/{id}", web::delete().to(users::delete_user))
        .route("/alumni", web::get().to(alumni::list_alumni))
        .route("/alumni", web::post().to(alumni::create_alumni))
        .route(
            "/alumni/graduation-year/{year}",
            web::get().to(alumni::graduation_year_report),
        )
        .route("/alumni/soft-delete/{id}", web::delete().to(alumni::delete_alumni))
        .route("/alumni/{id}", web::get().to(alumni::get_alumni))
        .route("/alumni/{id}", web::put().to(alumni::update_alumni))
        .route("/employment", web::post().to(employment::create_employment))
        .route("/employment", web::get().to(employment::list_employment))
        .route("/employment/trash", web::get().to(employment::list_trash))
        .route("/employment/trash/{id}", web::get().to(employment::get_trashed))
        .route(
            "/employment/alumni/{alumni_id}",
            web::get().to(employment::list_by_alumni),
        )
        .route(
            "/employment/soft-delete/{id}",
            web::delete().to(employment::soft_delete_employment),
        )
        .route(
            "/employment/restore/{id}",
            web::post().to(employment::restore_employment),
        )
        .route(
            "/employment/hard-delete/{id}",
            web::delete().to(employment::hard_delete_employment),
        )
        .route("/employment/{id}", web::get().to(employment::get_employment))
        .route("/employment/{id}", web::put().to(employment::update_employment))
        .route("/files/upload", web::post().to(files::upload_file))
        .route("/files", web::get().to(files::list_files))
        .route("/files/open/{id}", web::get().to(files::open_file))
        .route("/files/{id}", web::get().to(files::get_file))
        .route("/files/{id}", web::delete().to(files::delete_file))
}
