use crate::helper::{get_conn, HelperError};
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::notifications_db_operations::{self, NewNotification};
use crate::models::{ActivityLog, Notification, NotificationKind};
use crate::DbPool;
use rusqlite::Connection;

/// Appends a notification on the caller's connection so it lands in the
/// same transaction as the state change it reports.
pub fn notify(
    conn: &Connection,
    user_id: &str,
    kind: NotificationKind,
    title: &str,
    message: &str,
    link: Option<&str>,
) -> Result<(), HelperError> {
    notifications_db_operations::create_notification(
        conn,
        &NewNotification {
            user_id,
            kind,
            title,
            message,
            link,
        },
    )?;
    Ok(())
}

pub fn author_submission_link(submission_id: &str) -> String {
    format!("/dashboard/author/submissions/{}", submission_id)
}

pub fn editor_submission_link(submission_id: &str) -> String {
    format!("/dashboard/editor/submissions/{}", submission_id)
}

pub fn reviewer_review_link(review_id: &str) -> String {
    format!("/dashboard/reviewer/reviews/{}", review_id)
}

pub fn list_notifications(
    pool: &DbPool,
    user: &AuthenticatedUser,
    unread_only: bool,
) -> Result<Vec<Notification>, HelperError> {
    let conn = get_conn(pool)?;
    Ok(notifications_db_operations::list_notifications(&conn, &user.id, unread_only)?)
}

pub fn mark_read(pool: &DbPool, user: &AuthenticatedUser, notification_id: &str) -> Result<(), HelperError> {
    let conn = get_conn(pool)?;
    match notifications_db_operations::mark_read(&conn, notification_id, &user.id)? {
        0 => Err(HelperError::NotFound("Notification")),
        _ => Ok(()),
    }
}

pub fn mark_all_read(pool: &DbPool, user: &AuthenticatedUser) -> Result<usize, HelperError> {
    let conn = get_conn(pool)?;
    Ok(notifications_db_operations::mark_all_read(&conn, &user.id)?)
}

pub fn list_activity(pool: &DbPool, user: &AuthenticatedUser, submission_id: &str) -> Result<Vec<ActivityLog>, HelperError> {
    user.require_editorial()?;
    let conn = get_conn(pool)?;
    Ok(notifications_db_operations::list_activity(&conn, submission_id)?)
}
