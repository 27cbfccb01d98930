use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

/// Creates every table of the portal database. Safe to run repeatedly.
pub fn setup_portal_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;

    log::info!("Creating 'users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            full_name TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('AUTHOR', 'REVIEWER', 'EDITOR', 'ADMIN')),
            institution TEXT,
            country TEXT NOT NULL,
            orcid TEXT,
            specialties TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    log::info!("Creating 'submissions' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS submissions (
            id TEXT PRIMARY KEY,
            author_id TEXT NOT NULL,
            title TEXT NOT NULL,
            abstract TEXT NOT NULL,
            keywords TEXT,
            article_type TEXT NOT NULL,
            status TEXT NOT NULL,
            manuscript_file_url TEXT,
            figures_urls TEXT,
            word_count INTEGER,
            corresponding_author TEXT,
            co_authors TEXT,
            ethical_approval_number TEXT,
            funding_info TEXT,
            conflicts_of_interest TEXT,
            revision_count INTEGER NOT NULL DEFAULT 0,
            submitted_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (author_id) REFERENCES users(id)
        )",
        [],
    )?;

    log::info!("Creating 'reviews' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            submission_id TEXT NOT NULL,
            reviewer_id TEXT NOT NULL,
            invited_by TEXT,
            status TEXT NOT NULL,
            recommendation TEXT,
            comments_to_author TEXT,
            comments_to_editor TEXT,
            confidential_comments TEXT,
            review_quality TEXT,
            invited_at TEXT NOT NULL,
            responded_at TEXT,
            completed_at TEXT,
            due_date TEXT NOT NULL,
            round INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (submission_id) REFERENCES submissions(id),
            FOREIGN KEY (reviewer_id) REFERENCES users(id),
            FOREIGN KEY (invited_by) REFERENCES users(id)
        )",
        [],
    )?;

    log::info!("Creating 'publications' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS publications (
            id TEXT PRIMARY KEY,
            submission_id TEXT NOT NULL UNIQUE,
            doi TEXT NOT NULL UNIQUE,
            volume INTEGER,
            issue INTEGER,
            pages TEXT,
            published_date TEXT NOT NULL,
            views_count INTEGER NOT NULL DEFAULT 0,
            downloads_count INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (submission_id) REFERENCES submissions(id)
        )",
        [],
    )?;

    log::info!("Creating 'notifications' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            link TEXT,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )",
        [],
    )?;

    log::info!("Creating 'activity_logs' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS activity_logs (
            id TEXT PRIMARY KEY,
            submission_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            action TEXT NOT NULL,
            details TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (submission_id) REFERENCES submissions(id),
            FOREIGN KEY (user_id) REFERENCES users(id)
        )",
        [],
    )?;

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_submissions_author ON submissions(author_id, submitted_at);
         CREATE INDEX IF NOT EXISTS idx_reviews_submission ON reviews(submission_id);
         CREATE INDEX IF NOT EXISTS idx_reviews_reviewer ON reviews(reviewer_id);
         CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, created_at);
         CREATE INDEX IF NOT EXISTS idx_activity_submission ON activity_logs(submission_id, created_at);",
    )?;

    tx.commit()?;
    Ok(())
}
