use crate::helper::HelperError;
use actix_web::{web, HttpResponse, Responder};

pub mod articles;
pub mod auth;
pub mod notifications;
pub mod reviews;
pub mod submissions;
pub mod uploads;

/// Mounts the JSON API under `/api`. Malformed bodies and query strings are
/// answered with the same `{"error": ...}` shape as every other client error.
pub fn config_api(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .limit(256 * 1024)
        .error_handler(|err, _req| HelperError::Validation(format!("Invalid request body: {}", err)).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| HelperError::Validation(format!("Invalid query string: {}", err)).into());

    cfg.service(
        web::scope("/api")
            .app_data(json_config)
            .app_data(query_config)
            .route("/is_server_active", web::get().to(is_server_active))
            .configure(auth::config)
            .configure(submissions::config)
            .configure(reviews::config)
            .configure(articles::config)
            .configure(notifications::config)
            .configure(uploads::config),
    );
}

async fn is_server_active() -> impl Responder {
    HttpResponse::Ok().body("active")
}
