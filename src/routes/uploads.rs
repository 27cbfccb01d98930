use crate::config::Config;
use crate::helper::media_helpers;
use crate::helper::HelperError;
use crate::middleware::AuthenticatedUser;
use crate::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/uploads", web::post().to(upload_manuscript));
}

async fn upload_manuscript(
    auth_user: AuthenticatedUser,
    app_state: web::Data<AppState>,
    config: web::Data<Config>,
    payload: Multipart,
) -> Result<HttpResponse, HelperError> {
    let url = media_helpers::save_manuscript_upload(
        app_state.manuscript_store.clone(),
        &config.uploads,
        &auth_user,
        payload,
    )
    .await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "url": url })))
}
