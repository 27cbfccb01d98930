use crate::models::db_operations::{
    from_json_column, parse_optional_timestamp, parse_timestamp, timestamp, to_json_column,
};
use crate::models::{Recommendation, Review, ReviewAssignment, ReviewStatus, ReviewTally};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Row};
use uuid::Uuid;

const REVIEW_COLUMNS: &str = "r.id, r.submission_id, r.reviewer_id, r.invited_by, r.status, r.recommendation, \
     r.comments_to_author, r.comments_to_editor, r.confidential_comments, r.review_quality, \
     r.invited_at, r.responded_at, r.completed_at, r.due_date, r.round";

fn map_review(row: &Row) -> rusqlite::Result<Review> {
    let invited_at: String = row.get(10)?;
    let due_date: String = row.get(13)?;
    Ok(Review {
        id: row.get(0)?,
        submission_id: row.get(1)?,
        reviewer_id: row.get(2)?,
        invited_by: row.get(3)?,
        status: row.get(4)?,
        recommendation: row.get(5)?,
        comments_to_author: row.get(6)?,
        comments_to_editor: row.get(7)?,
        confidential_comments: row.get(8)?,
        review_quality: from_json_column(9, row.get(9)?)?,
        invited_at: parse_timestamp(10, &invited_at)?,
        responded_at: parse_optional_timestamp(11, row.get(11)?)?,
        completed_at: parse_optional_timestamp(12, row.get(12)?)?,
        due_date: parse_timestamp(13, &due_date)?,
        round: row.get(14)?,
    })
}

/// Inserts an INVITED review for the manuscript's current revision.
pub fn create_review(
    conn: &Connection,
    submission_id: &str,
    reviewer_id: &str,
    invited_by: &str,
    invited_at: DateTime<Utc>,
    due_date: DateTime<Utc>,
) -> Result<Review, RusqliteError> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO reviews (id, submission_id, reviewer_id, invited_by, status, invited_at, due_date, round)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, (SELECT revision_count FROM submissions WHERE id = ?2))",
        params![
            id,
            submission_id,
            reviewer_id,
            invited_by,
            ReviewStatus::Invited,
            timestamp(invited_at),
            timestamp(due_date),
        ],
    )?;

    read_review(conn, &id)?.ok_or(RusqliteError::QueryReturnedNoRows)
}

pub fn read_review(conn: &Connection, review_id: &str) -> Result<Option<Review>, RusqliteError> {
    conn.query_row(
        &format!("SELECT {} FROM reviews r WHERE r.id = ?1", REVIEW_COLUMNS),
        [review_id],
        map_review,
    )
    .optional()
}

pub fn list_reviews_for_submission(conn: &Connection, submission_id: &str) -> Result<Vec<Review>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM reviews r WHERE r.submission_id = ?1 ORDER BY r.invited_at ASC, r.rowid ASC",
        REVIEW_COLUMNS
    ))?;
    let rows = stmt.query_map([submission_id], map_review)?;
    rows.collect()
}

/// A reviewer's assignments, most recent invitation first.
pub fn list_assignments_for_reviewer(
    conn: &Connection,
    reviewer_id: &str,
) -> Result<Vec<ReviewAssignment>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, s.title FROM reviews r JOIN submissions s ON s.id = r.submission_id
         WHERE r.reviewer_id = ?1 ORDER BY r.invited_at DESC, r.rowid DESC",
        REVIEW_COLUMNS
    ))?;
    let rows = stmt.query_map([reviewer_id], |row| {
        Ok(ReviewAssignment {
            review: map_review(row)?,
            submission_title: row.get(15)?,
        })
    })?;
    rows.collect()
}

/// Completed reviews for the manuscript's current revision, in invitation order.
pub fn list_current_round_reports(conn: &Connection, submission_id: &str) -> Result<Vec<Review>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM reviews r JOIN submissions s ON s.id = r.submission_id
         WHERE r.submission_id = ?1 AND r.round = s.revision_count AND r.status = 'COMPLETED'
         ORDER BY r.invited_at ASC, r.rowid ASC",
        REVIEW_COLUMNS
    ))?;
    let rows = stmt.query_map([submission_id], map_review)?;
    rows.collect()
}

/// True when the reviewer has an open review on the submission, or has already
/// completed one for its current revision.
pub fn has_active_review(conn: &Connection, submission_id: &str, reviewer_id: &str) -> Result<bool, RusqliteError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM reviews r JOIN submissions s ON s.id = r.submission_id
         WHERE r.submission_id = ?1 AND r.reviewer_id = ?2
           AND (r.status IN ('INVITED', 'ACCEPTED', 'IN_PROGRESS', 'OVERDUE')
                OR (r.status = 'COMPLETED' AND r.round = s.revision_count)))",
        params![submission_id, reviewer_id],
        |row| row.get(0),
    )
}

/// Declined invitations do not grant access to the manuscript.
pub fn is_assigned_reviewer(conn: &Connection, submission_id: &str, user_id: &str) -> Result<bool, RusqliteError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM reviews WHERE submission_id = ?1 AND reviewer_id = ?2 AND status != ?3)",
        params![submission_id, user_id, ReviewStatus::Declined],
        |row| row.get(0),
    )
}

/// Counts only reviews invited for the manuscript's current revision.
pub fn review_tally(conn: &Connection, submission_id: &str) -> Result<ReviewTally, RusqliteError> {
    conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(r.status = 'COMPLETED'), 0),
                COALESCE(SUM(r.status IN ('INVITED', 'ACCEPTED', 'IN_PROGRESS')), 0)
         FROM reviews r JOIN submissions s ON s.id = r.submission_id
         WHERE r.submission_id = ?1 AND r.round = s.revision_count",
        [submission_id],
        |row| {
            Ok(ReviewTally {
                total: row.get(0)?,
                completed: row.get(1)?,
                pending: row.get(2)?,
            })
        },
    )
}

/// Field changes for one review write. `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct ReviewChanges {
    pub recommendation: Option<Recommendation>,
    pub comments_to_author: Option<String>,
    pub comments_to_editor: Option<String>,
    pub confidential_comments: Option<String>,
    pub review_quality: Option<serde_json::Value>,
    pub responded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub fn update_review(
    conn: &Connection,
    review_id: &str,
    status: ReviewStatus,
    changes: &ReviewChanges,
) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE reviews SET
            status = ?1,
            recommendation = COALESCE(?2, recommendation),
            comments_to_author = COALESCE(?3, comments_to_author),
            comments_to_editor = COALESCE(?4, comments_to_editor),
            confidential_comments = COALESCE(?5, confidential_comments),
            review_quality = COALESCE(?6, review_quality),
            responded_at = COALESCE(?7, responded_at),
            completed_at = COALESCE(?8, completed_at)
         WHERE id = ?9",
        params![
            status,
            changes.recommendation,
            changes.comments_to_author,
            changes.comments_to_editor,
            changes.confidential_comments,
            to_json_column(&changes.review_quality)?,
            changes.responded_at.map(timestamp),
            changes.completed_at.map(timestamp),
            review_id,
        ],
    )
}

/// Deadline sweep: every pending review whose due date has passed becomes OVERDUE.
pub fn mark_overdue(conn: &Connection, now: DateTime<Utc>) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE reviews SET status = ?1
         WHERE due_date < ?2 AND status IN ('INVITED', 'ACCEPTED', 'IN_PROGRESS')",
        params![ReviewStatus::Overdue, timestamp(now)],
    )
}
