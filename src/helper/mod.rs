use crate::models::UnknownVariant;
use crate::storage::StorageError;
use crate::DbPool;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde_json::json;
use thiserror::Error;

pub mod auth_helpers;
pub mod media_helpers;
pub mod notification_helpers;
pub mod publication_helpers;
pub mod review_helpers;
pub mod sanitization_helpers;
pub mod submission_helpers;

/// Everything a workflow operation can fail with. Client errors carry the message
/// returned to the caller; the rest are logged and answered with a generic 500.
#[derive(Error, Debug)]
pub enum HelperError {
    #[error("{0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthenticated,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Session error: {0}")]
    Session(String),
    #[error("Blocking task failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
}

impl From<UnknownVariant> for HelperError {
    fn from(e: UnknownVariant) -> Self {
        HelperError::Validation(format!("Invalid value: {}", e.0))
    }
}

impl HelperError {
    pub fn transition<T: std::fmt::Display>(from: T, to: T) -> Self {
        HelperError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            HelperError::Database(_)
                | HelperError::Pool(_)
                | HelperError::Hash(_)
                | HelperError::Json(_)
                | HelperError::Storage(_)
                | HelperError::Session(_)
                | HelperError::Blocking(_)
        )
    }
}

impl ResponseError for HelperError {
    fn status_code(&self) -> StatusCode {
        match self {
            HelperError::Validation(_) => StatusCode::BAD_REQUEST,
            HelperError::Unauthenticated | HelperError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            HelperError::Forbidden(_) => StatusCode::FORBIDDEN,
            HelperError::NotFound(_) => StatusCode::NOT_FOUND,
            HelperError::InvalidTransition { .. } | HelperError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_internal() {
            log::error!("{}", self);
            return HttpResponse::InternalServerError().json(json!({ "error": "Internal server error" }));
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

pub type PooledConn = PooledConnection<SqliteConnectionManager>;

// Helper to get a connection from the pool
pub fn get_conn(pool: &DbPool) -> Result<PooledConn, HelperError> {
    pool.get().map_err(HelperError::Pool)
}

/// Opens a write transaction that takes SQLite's write lock up front, so a
/// read-then-write sequence cannot deadlock against another writer.
pub fn begin_write(conn: &mut Connection) -> Result<Transaction<'_>, HelperError> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}
