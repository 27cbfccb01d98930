#![allow(dead_code)]

use actix_web::web;
use journal_portal::config::{Config, JournalConfig, SecurityConfig, UploadConfig, WebConfig};
use journal_portal::models::db_operations::submissions_db_operations;
use journal_portal::models::db_operations::users_db_operations::{self, NewUser};
use journal_portal::models::{ArticleType, NewSubmission, Role, SubmissionStatus, User};
use journal_portal::setup::db_setup;
use journal_portal::storage::LocalManuscriptStore;
use journal_portal::{build_pool, AppState, DbPool};
use std::sync::Arc;
use tempfile::TempDir;

pub const PASSWORD: &str = "Password123";

/// A throwaway portal: schema, media directory and configuration under one temp dir.
pub struct TestPortal {
    pub dir: TempDir,
    pub pool: DbPool,
    pub config: Config,
}

impl TestPortal {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_dir = dir.path().join("db");
        let media_dir = dir.path().join("media");
        std::fs::create_dir_all(db_dir.join("portal")).unwrap();
        std::fs::create_dir_all(&media_dir).unwrap();

        let config = Config {
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            journal: JournalConfig {
                name: "Global South Journal of Pediatrics".to_string(),
                doi_prefix: "10.5555/gsjp".to_string(),
                review_due_days: 21,
            },
            uploads: UploadConfig {
                max_size_mb: 1,
                allowed_mime_types: vec![
                    "application/pdf".to_string(),
                    "application/msword".to_string(),
                ],
            },
            security: SecurityConfig { password_hash_cost: 4 },
            database_path: db_dir.to_string_lossy().into_owned(),
            media_path: media_dir.to_string_lossy().into_owned(),
            allowed_origins: String::new(),
            log_level: "warn".to_string(),
            session_secret_key: "ab".repeat(64),
            use_secure_cookies: false,
        };

        let pool = build_pool(&config.portal_db_path()).unwrap();
        db_setup::setup_portal_db(&mut pool.get().unwrap()).unwrap();

        TestPortal { dir, pool, config }
    }

    pub fn app_state(&self) -> web::Data<AppState> {
        web::Data::new(AppState {
            manuscript_store: Arc::new(LocalManuscriptStore::new(
                self.config.manuscripts_path(),
                "/media/manuscripts",
            )),
        })
    }

    /// Provisions an account directly, the way `setup_cli user create` does for editorial roles.
    pub fn add_user(&self, email: &str, role: Role) -> User {
        let conn = self.pool.get().unwrap();
        users_db_operations::create_user(
            &conn,
            &NewUser {
                email,
                password: PASSWORD,
                full_name: email.split('@').next().unwrap(),
                role,
                institution: Some("University of Nairobi"),
                country: "Kenya",
                orcid: None,
                specialties: &[],
            },
            self.config.security.password_hash_cost,
        )
        .unwrap()
    }

    /// Inserts a manuscript that has already been through review and accepted.
    pub fn accepted_submission(&self, author: &User, title: &str, keywords: &[&str], file: Option<&str>) -> String {
        let conn = self.pool.get().unwrap();
        let submission = submissions_db_operations::create_submission(
            &conn,
            &NewSubmission {
                author_id: author.id.clone(),
                title: title.to_string(),
                abstract_text: format!("Abstract of {}", title),
                keywords: Some(keywords.iter().map(|k| k.to_string()).collect()),
                article_type: ArticleType::OriginalResearch,
                manuscript_file_url: file.map(str::to_string),
                figures_urls: None,
                word_count: Some(4200),
                corresponding_author: None,
                co_authors: None,
                ethical_approval_number: None,
                funding_info: None,
                conflicts_of_interest: None,
            },
        )
        .unwrap();
        submissions_db_operations::update_status(&conn, &submission.id, SubmissionStatus::Accepted).unwrap();
        submission.id
    }

    pub fn count(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> i64 {
        self.pool
            .get()
            .unwrap()
            .query_row(sql, params, |row| row.get(0))
            .unwrap()
    }
}

/// Builds the API service with a cookie session, the same middleware stack the server mounts.
macro_rules! portal_app {
    ($portal:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(
                    actix_session::SessionMiddleware::builder(
                        actix_session::storage::CookieSessionStore::default(),
                        actix_web::cookie::Key::generate(),
                    )
                    .cookie_secure(false)
                    .build(),
                )
                .app_data(actix_web::web::Data::new($portal.config.clone()))
                .app_data(actix_web::web::Data::new($portal.pool.clone()))
                .app_data($portal.app_state())
                .configure(journal_portal::routes::config_api),
        )
        .await
    };
}

/// Sends a `TestRequest` and returns the status with the body parsed as JSON
/// (`Value::Null` when the body is empty or not JSON).
macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = actix_web::test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body = actix_web::test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }};
}

/// Logs in through the API and returns the session cookie.
macro_rules! login {
    ($app:expr, $email:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/login")
            .set_json(serde_json::json!({ "email": $email, "password": common::PASSWORD }))
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK, "login failed for {}", $email);
        resp.response()
            .cookies()
            .find(|c| c.name() == "id")
            .expect("session cookie")
            .into_owned()
    }};
}

/// Submits a minimal manuscript as the logged-in author and returns its id.
macro_rules! submit {
    ($app:expr, $cookie:expr, $title:expr) => {{
        let (status, body) = send!(
            $app,
            actix_web::test::TestRequest::post()
                .uri("/api/submissions")
                .cookie($cookie.clone())
                .set_json(serde_json::json!({
                    "title": $title,
                    "abstract": "Background: childhood anaemia remains common in rural districts.",
                    "articleType": "ORIGINAL_RESEARCH",
                    "manuscriptFileUrl": "/media/manuscripts/ab/cd/paper.pdf",
                }))
        );
        assert_eq!(status, actix_web::http::StatusCode::CREATED, "{}", body);
        body["submissionId"].as_str().unwrap().to_string()
    }};
}
