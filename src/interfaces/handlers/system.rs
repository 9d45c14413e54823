use actix_web::{get, web, HttpResponse, Responder};
use humantime::format_duration;
use chrono::Utc;
use std::time::Duration;
use serde::Serialize;

use crate::{constants::START_TIME, AppState};

#[derive(Serialize)]
struct HealthCheckResponse {
    status: &'static str,
    version: &'static str,
    uptime: String,
    timestamp: String,
    start_at: String,
    store: &'static str,
    store_status: &'static str,
}

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let now_utc = Utc::now();
    let uptime_secs = now_utc.signed_duration_since(*START_TIME).num_seconds().max(0) as u64;

    let store_status = match state.store.ping().await {
        Ok(()) => "OK",
        Err(e) => {
            tracing::warn!(error = %e, "Record store unreachable");
            "Unavailable"
        }
    };

    // The endpoint keeps accepting submissions while the store is down.
    HttpResponse::Ok().json(HealthCheckResponse {
        status: if store_status == "OK" { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: format_duration(Duration::from_secs(uptime_secs)).to_string(),
        timestamp: now_utc.to_rfc3339(),
        start_at: START_TIME.to_rfc3339(),
        store: state.store.kind(),
        store_status,
    })
}
