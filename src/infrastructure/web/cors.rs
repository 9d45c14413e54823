use actix_cors::Cors;
use actix_web::http::{header, Method};

use crate::utils::origin::is_origin_allowed;

const PREFLIGHT_MAX_AGE: usize = 600;

/// CORS policy for the submission endpoint. Disallowed origins are not
/// blocked here; the handler answers them with its own 403 body.
pub fn build_cors(allowed_origins: Vec<String>) -> Cors {
    Cors::default()
        .allowed_origin_fn(move |origin, _req| {
            is_origin_allowed(origin.to_str().ok(), &allowed_origins)
        })
        .allowed_methods([Method::POST, Method::OPTIONS])
        .allowed_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-api-key"),
        ])
        .max_age(PREFLIGHT_MAX_AGE)
        .block_on_origin_mismatch(false)
}
