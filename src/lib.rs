use std::path::Path;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::storage::ManuscriptStore;

pub type DbPool = Pool<SqliteConnectionManager>;

pub struct AppState {
    pub manuscript_store: Arc<dyn ManuscriptStore>,
}

/// Opens a pool over the portal database. Every pooled connection enforces
/// foreign keys and waits on a busy database instead of failing immediately.
pub fn build_pool(db_path: &Path) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
    });
    Pool::new(manager)
}

pub mod config;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;
pub mod storage;
