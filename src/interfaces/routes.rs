use actix_web::{http::Method, web};

use crate::constants::MAX_BODY_BYTES;
use crate::handlers::{
    submit::{method_not_allowed, options_ok, submit_form},
    system::health_check,
};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check);

    cfg.service(
        web::resource("/submit")
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .route(web::post().to(submit_form))
            .route(web::method(Method::OPTIONS).to(options_ok))
            .default_service(web::to(method_not_allowed)),
    );
}
