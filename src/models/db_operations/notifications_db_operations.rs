use crate::models::db_operations::{parse_timestamp, timestamp};
use crate::models::{ActivityAction, ActivityLog, Notification, NotificationKind};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Error as RusqliteError, Row};
use uuid::Uuid;

pub struct NewNotification<'a> {
    pub user_id: &'a str,
    pub kind: NotificationKind,
    pub title: &'a str,
    pub message: &'a str,
    pub link: Option<&'a str>,
}

fn map_notification(row: &Row) -> rusqlite::Result<Notification> {
    let created_at: String = row.get(7)?;
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        link: row.get(5)?,
        is_read: row.get(6)?,
        created_at: parse_timestamp(7, &created_at)?,
    })
}

pub fn create_notification(conn: &Connection, new: &NewNotification) -> Result<String, RusqliteError> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO notifications (id, user_id, kind, title, message, link, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
        params![
            id,
            new.user_id,
            new.kind,
            new.title,
            new.message,
            new.link,
            timestamp(Utc::now()),
        ],
    )?;
    Ok(id)
}

/// A user's notifications, newest first.
pub fn list_notifications(conn: &Connection, user_id: &str, unread_only: bool) -> Result<Vec<Notification>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, title, message, link, is_read, created_at
         FROM notifications
         WHERE user_id = ?1 AND (?2 = 0 OR is_read = 0)
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map(params![user_id, unread_only], map_notification)?;
    rows.collect()
}

/// Marks one notification read. Only touches rows owned by `user_id`.
pub fn mark_read(conn: &Connection, notification_id: &str, user_id: &str) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
        params![notification_id, user_id],
    )
}

pub fn mark_all_read(conn: &Connection, user_id: &str) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
        [user_id],
    )
}

pub fn log_activity(
    conn: &Connection,
    submission_id: &str,
    user_id: &str,
    action: ActivityAction,
    details: &serde_json::Value,
) -> Result<(), RusqliteError> {
    conn.execute(
        "INSERT INTO activity_logs (id, submission_id, user_id, action, details, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            Uuid::new_v4().to_string(),
            submission_id,
            user_id,
            action,
            details.to_string(),
            timestamp(Utc::now()),
        ],
    )?;
    Ok(())
}

/// Activity for one submission, oldest first.
pub fn list_activity(conn: &Connection, submission_id: &str) -> Result<Vec<ActivityLog>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, submission_id, user_id, action, details, created_at
         FROM activity_logs WHERE submission_id = ?1 ORDER BY created_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map([submission_id], |row| {
        let details: String = row.get(4)?;
        let created_at: String = row.get(5)?;
        Ok(ActivityLog {
            id: row.get(0)?,
            submission_id: row.get(1)?,
            user_id: row.get(2)?,
            action: row.get(3)?,
            details: serde_json::from_str(&details)
                .map_err(|e| RusqliteError::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
            created_at: parse_timestamp(5, &created_at)?,
        })
    })?;
    rows.collect()
}
