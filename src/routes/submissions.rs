use crate::config::Config;
use crate::helper::notification_helpers;
use crate::helper::publication_helpers::{self, PublishRequest};
use crate::helper::submission_helpers::{
    self, DecisionRequest, RevisionRequest, SubmissionRequest, WithdrawRequest,
};
use crate::helper::HelperError;
use crate::middleware::AuthenticatedUser;
use crate::models::SubmissionStatus;
use crate::DbPool;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct StatusQuery {
    status: Option<SubmissionStatus>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/submissions", web::post().to(create_submission))
        .route("/submissions", web::get().to(list_own_submissions))
        .route("/submissions/{id}", web::get().to(get_submission))
        .route("/submissions/{id}/decision", web::post().to(record_decision))
        .route("/submissions/{id}/revisions", web::post().to(submit_revision))
        .route("/submissions/{id}/withdraw", web::post().to(withdraw_submission))
        .route("/submissions/{id}/publish", web::post().to(publish_submission))
        .route("/submissions/{id}/reviews", web::get().to(list_submission_reviews))
        .route("/submissions/{id}/activity", web::get().to(list_activity))
        .route("/editor/submissions", web::get().to(list_editor_submissions));
}

async fn create_submission(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    body: web::Json<SubmissionRequest>,
) -> Result<HttpResponse, HelperError> {
    let submission = submission_helpers::create_submission(&pool, &auth_user, body.into_inner())?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "submissionId": submission.id,
        "message": "Submission created successfully",
    })))
}

async fn list_own_submissions(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, HelperError> {
    let submissions = submission_helpers::list_own_submissions(&pool, &auth_user)?;
    Ok(HttpResponse::Ok().json(json!({ "submissions": submissions })))
}

async fn get_submission(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
) -> Result<HttpResponse, HelperError> {
    let submission = submission_helpers::get_submission(&pool, &auth_user, &id)?;
    Ok(HttpResponse::Ok().json(json!({ "submission": submission })))
}

async fn record_decision(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
    body: web::Json<DecisionRequest>,
) -> Result<HttpResponse, HelperError> {
    let submission = submission_helpers::record_decision(&pool, &auth_user, &id, body.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "submission": submission })))
}

async fn submit_revision(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
    body: web::Json<RevisionRequest>,
) -> Result<HttpResponse, HelperError> {
    let submission = submission_helpers::submit_revision(&pool, &auth_user, &id, body.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "submission": submission })))
}

async fn withdraw_submission(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
    body: Option<web::Json<WithdrawRequest>>,
) -> Result<HttpResponse, HelperError> {
    let request = body.map(|b| b.into_inner()).unwrap_or_default();
    let submission = submission_helpers::withdraw_submission(&pool, &auth_user, &id, request)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "submission": submission })))
}

async fn publish_submission(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    id: web::Path<String>,
    body: Option<web::Json<PublishRequest>>,
) -> Result<HttpResponse, HelperError> {
    let request = body.map(|b| b.into_inner()).unwrap_or_default();
    let publication = publication_helpers::publish_submission(
        &pool,
        &auth_user,
        &id,
        request,
        &config.journal.doi_prefix,
    )?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "publication": publication })))
}

async fn list_submission_reviews(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
) -> Result<HttpResponse, HelperError> {
    let (reviews, tally) = submission_helpers::list_submission_reviews(&pool, &auth_user, &id)?;
    Ok(HttpResponse::Ok().json(json!({
        "reviews": reviews,
        "completed": tally.completed,
        "pending": tally.pending,
        "decisionReady": tally.decision_ready(),
    })))
}

async fn list_activity(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    id: web::Path<String>,
) -> Result<HttpResponse, HelperError> {
    let activity = notification_helpers::list_activity(&pool, &auth_user, &id)?;
    Ok(HttpResponse::Ok().json(json!({ "activity": activity })))
}

async fn list_editor_submissions(
    auth_user: AuthenticatedUser,
    pool: web::Data<DbPool>,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse, HelperError> {
    let submissions = submission_helpers::list_overviews(&pool, &auth_user, query.status)?;
    Ok(HttpResponse::Ok().json(json!({ "submissions": submissions })))
}
