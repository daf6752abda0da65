use actix_web::{get, web, HttpResponse};

use crate::{app_state::AppState, config::StorageBackend};

#[get("/health")]
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[get("/health/ready")]
async fn health_check_ready(state: web::Data<AppState>) -> HttpResponse {
    let storage_ok = match &state.database {
        Some(db) => db.health_check().await.is_ok(),
        None => state.config.storage_backend == StorageBackend::Memory,
    };

    let response = serde_json::json!({
        "status": if storage_ok { "ready" } else { "not_ready" },
        "version": env!("CARGO_PKG_VERSION"),
        "dependencies": {
            "storage": if storage_ok { "ok" } else { "error" }
        }
    });

    if storage_ok {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

#[get("/health/live")]
async fn health_check_live() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
