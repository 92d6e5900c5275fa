use actix_web::{web, HttpResponse};

use crate::error::ApiResult;
use crate::services::Backends;

fn describe(backend: &str, result: &ApiResult<()>) -> &'static str {
    match result {
        Ok(()) => "connected",
        Err(e) => {
            tracing::error!("Health check failed for {} backend: {}", backend, e);
            "unavailable"
        }
    }
}

pub async fn health(backends: web::Data<Backends>) -> HttpResponse {
    let relational = backends.relational.ping().await;
    let document = backends.document.ping().await;
    let healthy = relational.is_ok() && document.is_ok();

    let body = serde_json::json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "relational": describe("relational", &relational),
        "document": describe("document", &document),
    });

    if healthy {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
