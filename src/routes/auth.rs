use crate::config::Config;
use crate::helper::auth_helpers::{self, RegisterRequest};
use crate::helper::HelperError;
use crate::middleware::{begin_session, AuthenticatedUser};
use crate::models::UserSummary;
use crate::DbPool;
use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
        .route("/logout", web::post().to(logout))
        .route("/me", web::get().to(me));
}

async fn register(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, HelperError> {
    let request = body.into_inner();
    // bcrypt is CPU bound; keep it off the async workers.
    let user = web::block(move || {
        auth_helpers::register(
            &pool,
            request,
            config.security.password_hash_cost,
            &config.journal.name,
        )
    })
    .await??;

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "user": UserSummary::from(&user),
    })))
}

async fn login(
    session: Session,
    pool: web::Data<DbPool>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, HelperError> {
    let LoginRequest { email, password } = body.into_inner();
    let user = web::block(move || auth_helpers::login(&pool, &email, &password)).await??;

    begin_session(&session, &user.id, user.role)?;
    log::info!("User {} logged in", user.id);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Login successful",
        "user": UserSummary::from(&user),
    })))
}

async fn logout(session: Session) -> HttpResponse {
    session.purge();
    HttpResponse::Ok().json(json!({ "message": "Logged out" }))
}

async fn me(auth_user: AuthenticatedUser, pool: web::Data<DbPool>) -> Result<HttpResponse, HelperError> {
    let user = auth_helpers::current_user(&pool, &auth_user.id)?;
    Ok(HttpResponse::Ok().json(json!({ "user": user })))
}
