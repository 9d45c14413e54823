use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde_json::Value;

use crate::{
    errors::AppError,
    utils::{get_client_ip::client_info, origin::is_origin_allowed},
    AppState,
};

/// `POST /submit`
pub async fn submit_form(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());

    if !is_origin_allowed(origin, &state.allowed_origins) {
        tracing::warn!(origin = ?origin, "Request from disallowed origin");
        return Err(AppError::ForbiddenOrigin);
    }

    // A missing body is treated as an empty object and fails validation.
    let raw: Value = if body.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::InvalidJson(e.to_string()))?
    };

    let client = client_info(&req, state.trust_x_forwarded_for);
    let receipt = state.submission_handler.process(&raw, &client).await?;

    Ok(HttpResponse::Ok().json(receipt))
}

/// Plain `OPTIONS` requests that are not CORS preflights.
pub async fn options_ok() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "message": "OK" }))
}

pub async fn method_not_allowed() -> Result<HttpResponse, AppError> {
    Err(AppError::MethodNotAllowed)
}
