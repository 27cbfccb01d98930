use crate::models::db_operations::{from_json_column, parse_timestamp, timestamp, to_json_column};
use crate::models::{
    NewSubmission, ReviewTally, Submission, SubmissionOverview, SubmissionStatus, SubmissionSummary,
};
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Row};
use uuid::Uuid;

const SUBMISSION_COLUMNS: &str = "id, author_id, title, abstract, keywords, article_type, status, \
     manuscript_file_url, figures_urls, word_count, corresponding_author, co_authors, \
     ethical_approval_number, funding_info, conflicts_of_interest, revision_count, submitted_at, updated_at";

fn map_submission(row: &Row) -> rusqlite::Result<Submission> {
    let submitted_at: String = row.get(16)?;
    let updated_at: String = row.get(17)?;
    Ok(Submission {
        id: row.get(0)?,
        author_id: row.get(1)?,
        title: row.get(2)?,
        abstract_text: row.get(3)?,
        keywords: from_json_column(4, row.get(4)?)?,
        article_type: row.get(5)?,
        status: row.get(6)?,
        manuscript_file_url: row.get(7)?,
        figures_urls: from_json_column(8, row.get(8)?)?,
        word_count: row.get(9)?,
        corresponding_author: from_json_column(10, row.get(10)?)?,
        co_authors: from_json_column(11, row.get(11)?)?,
        ethical_approval_number: row.get(12)?,
        funding_info: row.get(13)?,
        conflicts_of_interest: row.get(14)?,
        revision_count: row.get(15)?,
        submitted_at: parse_timestamp(16, &submitted_at)?,
        updated_at: parse_timestamp(17, &updated_at)?,
    })
}

pub fn create_submission(conn: &Connection, new: &NewSubmission) -> Result<Submission, RusqliteError> {
    let id = Uuid::new_v4().to_string();
    let now = timestamp(Utc::now());

    conn.execute(
        &format!(
            "INSERT INTO submissions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, 0, ?16, ?16)",
            SUBMISSION_COLUMNS
        ),
        params![
            id,
            new.author_id,
            new.title,
            new.abstract_text,
            to_json_column(&new.keywords)?,
            new.article_type,
            SubmissionStatus::Submitted,
            new.manuscript_file_url,
            to_json_column(&new.figures_urls)?,
            new.word_count,
            to_json_column(&new.corresponding_author)?,
            to_json_column(&new.co_authors)?,
            new.ethical_approval_number,
            new.funding_info,
            new.conflicts_of_interest,
            now,
        ],
    )?;

    read_submission(conn, &id)?.ok_or(RusqliteError::QueryReturnedNoRows)
}

pub fn read_submission(conn: &Connection, submission_id: &str) -> Result<Option<Submission>, RusqliteError> {
    conn.query_row(
        &format!("SELECT {} FROM submissions WHERE id = ?1", SUBMISSION_COLUMNS),
        [submission_id],
        map_submission,
    )
    .optional()
}

/// An author's own manuscripts, newest first.
pub fn list_submissions_for_author(conn: &Connection, author_id: &str) -> Result<Vec<SubmissionSummary>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, article_type, status, submitted_at, updated_at
         FROM submissions WHERE author_id = ?1 ORDER BY submitted_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map([author_id], |row| {
        let submitted_at: String = row.get(4)?;
        let updated_at: String = row.get(5)?;
        Ok(SubmissionSummary {
            id: row.get(0)?,
            title: row.get(1)?,
            article_type: row.get(2)?,
            status: row.get(3)?,
            submitted_at: parse_timestamp(4, &submitted_at)?,
            updated_at: parse_timestamp(5, &updated_at)?,
        })
    })?;
    rows.collect()
}

/// Every submission with its review tally, for the editorial dashboard.
pub fn list_submission_overviews(
    conn: &Connection,
    status: Option<SubmissionStatus>,
) -> Result<Vec<SubmissionOverview>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.title, s.article_type, s.status, u.full_name, s.submitted_at,
                (SELECT COUNT(*) FROM reviews r WHERE r.submission_id = s.id AND r.round = s.revision_count),
                (SELECT COUNT(*) FROM reviews r WHERE r.submission_id = s.id AND r.round = s.revision_count
                    AND r.status = 'COMPLETED'),
                (SELECT COUNT(*) FROM reviews r WHERE r.submission_id = s.id AND r.round = s.revision_count
                    AND r.status IN ('INVITED', 'ACCEPTED', 'IN_PROGRESS'))
         FROM submissions s JOIN users u ON u.id = s.author_id
         WHERE (?1 IS NULL OR s.status = ?1)
         ORDER BY s.submitted_at DESC, s.rowid DESC",
    )?;
    let rows = stmt.query_map(params![status], |row| {
        let submitted_at: String = row.get(5)?;
        let tally = ReviewTally {
            total: row.get(6)?,
            completed: row.get(7)?,
            pending: row.get(8)?,
        };
        Ok(SubmissionOverview {
            id: row.get(0)?,
            title: row.get(1)?,
            article_type: row.get(2)?,
            status: row.get(3)?,
            author_name: row.get(4)?,
            submitted_at: parse_timestamp(5, &submitted_at)?,
            reviews_total: tally.total,
            reviews_completed: tally.completed,
            reviews_pending: tally.pending,
            decision_ready: tally.decision_ready(),
        })
    })?;
    rows.collect()
}

pub fn update_status(conn: &Connection, submission_id: &str, status: SubmissionStatus) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE submissions SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status, timestamp(Utc::now()), submission_id],
    )
}

/// Moves a submission to REVISED_SUBMITTED, bumping its revision counter and
/// replacing the manuscript file when a new one is supplied.
pub fn record_revision(
    conn: &Connection,
    submission_id: &str,
    manuscript_file_url: Option<&str>,
) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE submissions
         SET status = ?1,
             revision_count = revision_count + 1,
             manuscript_file_url = COALESCE(?2, manuscript_file_url),
             updated_at = ?3
         WHERE id = ?4",
        params![
            SubmissionStatus::RevisedSubmitted,
            manuscript_file_url,
            timestamp(Utc::now()),
            submission_id
        ],
    )
}
