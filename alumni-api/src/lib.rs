pub mod auth;
pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod policy;
pub mod query;
pub mod routes;
pub mod services;
pub mod store;

pub use database::Database;
pub use document::DocumentDb;
pub use error::{ApiError, ApiResult, ErrorKind};

use anyhow::Context;
use config::ApiConfig;
use services::{Backend, BackendSettings, Backends};
use std::sync::Arc;
use store::BackendKind;

/// Open both stores and wire them into services.
///
/// The document store is returned alongside so the caller can flush it on
/// shutdown.
pub fn open_backends(config: &ApiConfig) -> anyhow::Result<(Backends, Arc<DocumentDb>)> {
    let timeout = config.storage.query_timeout();

    let database_path = config.storage.database_path();
    let database = Database::new(&database_path, timeout)
        .with_context(|| format!("Failed to open database at {:?}", database_path))?;
    tracing::info!("Relational store at {:?}", database_path);

    let document_path = config.storage.document_path();
    let documents = Arc::new(
        DocumentDb::open(&document_path, timeout)
            .with_context(|| format!("Failed to open document store at {:?}", document_path))?,
    );
    tracing::info!("Document store at {:?}", document_path);

    let settings = BackendSettings::from_config(config);
    let backends = Backends {
        relational: Backend::new(BackendKind::Relational, database.stores(), &settings),
        document: Backend::new(BackendKind::Document, documents.stores(), &settings),
    };

    Ok((backends, documents))
}
