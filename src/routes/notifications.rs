use crate::helper::notification_helpers;
use crate::helper::HelperError;
use crate::middleware::AuthenticatedUser;
use crate::DbPool;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationQuery {
    unread_only: Option<bool>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/notifications", web::get().to(list_notifications))
        .route("/notifications/read-all", web::post().to(mark_all_read))
        .route("/notifications/{id}/read", web::post().to(mark_read));
}

async fn list_notifications(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    query: web::Query<NotificationQuery>,
) -> Result<HttpResponse, HelperError> {
    let notifications =
        notification_helpers::list_notifications(&pool, &auth_user, query.unread_only.unwrap_or(false))?;
    let unread = notifications.iter().filter(|n| !n.is_read).count();
    Ok(HttpResponse::Ok().json(json!({ "notifications": notifications, "unreadCount": unread })))
}

async fn mark_read(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
) -> Result<HttpResponse, HelperError> {
    notification_helpers::mark_read(&pool, &auth_user, &id)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn mark_all_read(auth_user: AuthenticatedUser, pool: web::Data<DbPool>) -> Result<HttpResponse, HelperError> {
    let updated = notification_helpers::mark_all_read(&pool, &auth_user)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "updated": updated })))
}
