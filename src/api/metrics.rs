use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

static REQUEST_COUNT: AtomicU64 = AtomicU64::new(0);
static CLIENT_ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static SERVER_ERROR_COUNT: AtomicU64 = AtomicU64::new(0);
static STARTED_AT: OnceLock<Instant> = OnceLock::new();

pub fn mark_started() {
    STARTED_AT.get_or_init(Instant::now);
}

pub fn increment_request_count() {
    REQUEST_COUNT.fetch_add(1, Ordering::Relaxed);
}

/// Counts a finished response by its status class. 2xx/3xx are not tracked separately.
pub fn record_status(status: u16) {
    match status {
        400..=499 => CLIENT_ERROR_COUNT.fetch_add(1, Ordering::Relaxed),
        500..=599 => SERVER_ERROR_COUNT.fetch_add(1, Ordering::Relaxed),
        _ => return,
    };
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsResponse {
    pub http_requests_total: u64,
    pub http_client_errors_total: u64,
    pub http_server_errors_total: u64,
    pub process_uptime_seconds: u64,
}

impl MetricsResponse {
    fn snapshot() -> Self {
        MetricsResponse {
            http_requests_total: REQUEST_COUNT.load(Ordering::Relaxed),
            http_client_errors_total: CLIENT_ERROR_COUNT.load(Ordering::Relaxed),
            http_server_errors_total: SERVER_ERROR_COUNT.load(Ordering::Relaxed),
            process_uptime_seconds: STARTED_AT.get().map(|t| t.elapsed().as_secs()).unwrap_or(0),
        }
    }

    fn to_prometheus(&self) -> String {
        format!(
            "# HELP http_requests_total Total number of HTTP requests\n\
             # TYPE http_requests_total counter\n\
             http_requests_total {}\n\
             \n\
             # HELP http_errors_total Total number of HTTP error responses\n\
             # TYPE http_errors_total counter\n\
             http_errors_total{{class=\"4xx\"}} {}\n\
             http_errors_total{{class=\"5xx\"}} {}\n\
             \n\
             # HELP process_uptime_seconds Seconds since the server started\n\
             # TYPE process_uptime_seconds gauge\n\
             process_uptime_seconds {}\n",
            self.http_requests_total,
            self.http_client_errors_total,
            self.http_server_errors_total,
            self.process_uptime_seconds
        )
    }
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Prometheus text exposition", body = String, content_type = "text/plain")
    )
)]
pub async fn get_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(MetricsResponse::snapshot().to_prometheus())
}
