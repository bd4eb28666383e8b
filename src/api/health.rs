use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::database::MongoDB;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: String,
    pub timestamp: i64,
}

impl HealthResponse {
    fn new(database_up: bool) -> Self {
        HealthResponse {
            status: if database_up { "healthy" } else { "degraded" }.to_string(),
            service: "travel-diary-service".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if database_up { "connected" } else { "unreachable" }.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(db: web::Data<MongoDB>) -> HttpResponse {
    let database_up = db.health_check().await;
    if !database_up {
        log::warn!("⚠️  Health check: database ping failed");
        return HttpResponse::ServiceUnavailable().json(HealthResponse::new(false));
    }

    HttpResponse::Ok().json(HealthResponse::new(true))
}
