use crate::config::Config;
use crate::helper::review_helpers::{self, AssignRequest, ReviewUpdateRequest};
use crate::helper::HelperError;
use crate::middleware::AuthenticatedUser;
use crate::DbPool;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/reviews", web::post().to(assign_reviewers))
        .route("/reviews/mine", web::get().to(list_my_reviews))
        .route("/reviews/{id}", web::get().to(get_review))
        .route("/reviews/{id}", web::patch().to(update_review))
        .route("/reviewers", web::get().to(list_reviewers));
}

async fn assign_reviewers(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    body: web::Json<AssignRequest>,
) -> Result<HttpResponse, HelperError> {
    let reviews = review_helpers::assign_reviewers(
        &pool,
        &auth_user,
        body.into_inner(),
        config.journal.review_due_days,
    )?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "reviews": reviews })))
}

async fn list_my_reviews(auth_user: AuthenticatedUser, pool: web::Data<DbPool>) -> Result<HttpResponse, HelperError> {
    let reviews = review_helpers::list_my_reviews(&pool, &auth_user)?;
    Ok(HttpResponse::Ok().json(json!({ "reviews": reviews })))
}

async fn get_review(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
) -> Result<HttpResponse, HelperError> {
    let review = review_helpers::get_review(&pool, &auth_user, &id)?;
    Ok(HttpResponse::Ok().json(json!({ "review": review })))
}

async fn update_review(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
    body: web::Json<ReviewUpdateRequest>,
) -> Result<HttpResponse, HelperError> {
    let review = review_helpers::update_review(&pool, &auth_user, &id, body.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "review": review })))
}

async fn list_reviewers(auth_user: AuthenticatedUser, pool: web::Data<DbPool>) -> Result<HttpResponse, HelperError> {
    let reviewers = review_helpers::list_reviewers(&pool, &auth_user)?;
    Ok(HttpResponse::Ok().json(json!({ "reviewers": reviewers })))
}
