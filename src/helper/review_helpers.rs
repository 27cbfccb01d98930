use crate::helper::notification_helpers::{editor_submission_link, notify, reviewer_review_link};
use crate::helper::sanitization_helpers::clean_optional;
use crate::helper::submission_helpers::{ensure_transition, load_submission};
use crate::helper::{begin_write, get_conn, HelperError};
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::reviews_db_operations::{self, ReviewChanges};
use crate::models::db_operations::{
    notifications_db_operations, submissions_db_operations, users_db_operations,
};
use crate::models::{
    ActivityAction, NotificationKind, Recommendation, Review, ReviewAssignment, ReviewStatus,
    ReviewerCandidate, SubmissionStatus,
};
use crate::DbPool;
use chrono::{Duration, Utc};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub submission_id: Option<String>,
    pub reviewer_ids: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdateRequest {
    pub status: Option<ReviewStatus>,
    pub recommendation: Option<Recommendation>,
    pub comments_to_author: Option<String>,
    pub comments_to_editor: Option<String>,
    pub confidential_comments: Option<String>,
    pub review_quality: Option<serde_json::Value>,
}

impl ReviewUpdateRequest {
    fn carries_report(&self) -> bool {
        self.recommendation.is_some()
            || self.comments_to_author.is_some()
            || self.comments_to_editor.is_some()
            || self.confidential_comments.is_some()
            || self.review_quality.is_some()
    }
}

fn load_review(conn: &Connection, review_id: &str) -> Result<Review, HelperError> {
    reviews_db_operations::read_review(conn, review_id)?.ok_or(HelperError::NotFound("Review"))
}

/// Invites each reviewer once, moves the manuscript to UNDER_REVIEW and
/// notifies every invitee, all in one transaction.
pub fn assign_reviewers(
    pool: &DbPool,
    user: &AuthenticatedUser,
    request: AssignRequest,
    review_due_days: i64,
) -> Result<Vec<Review>, HelperError> {
    user.require_editorial()?;
    let submission_id = request
        .submission_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| HelperError::Validation("submissionId is required".to_string()))?;

    let mut seen = HashSet::new();
    let reviewer_ids: Vec<String> = request
        .reviewer_ids
        .unwrap_or_default()
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect();
    if reviewer_ids.is_empty() {
        return Err(HelperError::Validation("At least one reviewer is required".to_string()));
    }

    let mut conn = get_conn(pool)?;
    let tx = begin_write(&mut conn)?;
    let submission = load_submission(&tx, &submission_id)?;
    ensure_transition(submission.status, SubmissionStatus::UnderReview)?;

    for reviewer_id in &reviewer_ids {
        let reviewer = users_db_operations::read_user_by_id(&tx, reviewer_id)?
            .ok_or_else(|| HelperError::Validation(format!("Unknown reviewer {}", reviewer_id)))?;
        if !reviewer.role.can_review() {
            return Err(HelperError::Validation(format!(
                "{} cannot be invited to review",
                reviewer.full_name
            )));
        }
        if reviewer.id == submission.author_id {
            return Err(HelperError::Validation(
                "The author cannot review their own submission".to_string(),
            ));
        }
        if reviews_db_operations::has_active_review(&tx, &submission_id, reviewer_id)? {
            return Err(HelperError::Validation(format!(
                "{} is already reviewing this submission",
                reviewer.full_name
            )));
        }
    }

    let invited_at = Utc::now();
    let due_date = invited_at + Duration::days(review_due_days);
    let mut reviews = Vec::with_capacity(reviewer_ids.len());
    for reviewer_id in &reviewer_ids {
        let review = reviews_db_operations::create_review(&tx, &submission_id, reviewer_id, &user.id, invited_at, due_date)?;
        notify(
            &tx,
            reviewer_id,
            NotificationKind::ReviewInvitation,
            "New Review Invitation",
            &format!(
                "You have been invited to review \"{}\". Please respond by {}.",
                submission.title,
                due_date.format("%Y-%m-%d")
            ),
            Some(&reviewer_review_link(&review.id)),
        )?;
        reviews.push(review);
    }

    submissions_db_operations::update_status(&tx, &submission_id, SubmissionStatus::UnderReview)?;
    notifications_db_operations::log_activity(
        &tx,
        &submission_id,
        &user.id,
        ActivityAction::ReviewersAssigned,
        &json!({ "reviewerIds": reviewer_ids, "dueDate": due_date }),
    )?;
    tx.commit()?;

    log::info!("{} reviewer(s) assigned to submission {}", reviews.len(), submission_id);
    Ok(reviews)
}

pub fn list_my_reviews(pool: &DbPool, user: &AuthenticatedUser) -> Result<Vec<ReviewAssignment>, HelperError> {
    let conn = get_conn(pool)?;
    Ok(reviews_db_operations::list_assignments_for_reviewer(&conn, &user.id)?)
}

pub fn get_review(pool: &DbPool, user: &AuthenticatedUser, review_id: &str) -> Result<Review, HelperError> {
    let conn = get_conn(pool)?;
    let review = load_review(&conn, review_id)?;
    if review.reviewer_id == user.id || user.is_editorial() {
        Ok(review)
    } else {
        Err(HelperError::Forbidden("You are not assigned to this review".to_string()))
    }
}

/// Applies a reviewer's response, progress or completion. Only the reviewer
/// stored on the review may write to it.
pub fn update_review(
    pool: &DbPool,
    user: &AuthenticatedUser,
    review_id: &str,
    request: ReviewUpdateRequest,
) -> Result<Review, HelperError> {
    let next = request
        .status
        .ok_or_else(|| HelperError::Validation("status is required".to_string()))?;

    let mut conn = get_conn(pool)?;
    let tx = begin_write(&mut conn)?;
    let review = load_review(&tx, review_id)?;
    if review.reviewer_id != user.id {
        log::warn!("User {} tried to update review {} assigned to someone else", user.id, review_id);
        return Err(HelperError::Forbidden("You are not assigned to this review".to_string()));
    }
    if !next.reviewer_may_request() {
        return Err(HelperError::Validation(format!("Status {} cannot be set by a reviewer", next)));
    }
    if !review.status.can_transition_to(next) {
        return Err(HelperError::transition(review.status, next));
    }
    if next != ReviewStatus::Completed && request.carries_report() {
        return Err(HelperError::Validation(
            "A recommendation, comments and quality ratings can only be sent with status COMPLETED".to_string(),
        ));
    }
    let submission = load_submission(&tx, &review.submission_id)?;
    if !submission.status.accepts_review_work() {
        return Err(HelperError::Conflict(format!(
            "Submission is {} and no longer takes reviews",
            submission.status
        )));
    }

    let now = Utc::now();
    let mut changes = ReviewChanges {
        recommendation: request.recommendation,
        comments_to_author: clean_optional(request.comments_to_author),
        comments_to_editor: clean_optional(request.comments_to_editor),
        confidential_comments: clean_optional(request.confidential_comments),
        review_quality: request.review_quality,
        ..Default::default()
    };
    let action = match next {
        ReviewStatus::Accepted => {
            changes.responded_at = Some(now);
            ActivityAction::ReviewAccepted
        }
        ReviewStatus::Declined => {
            changes.responded_at = Some(now);
            ActivityAction::ReviewDeclined
        }
        ReviewStatus::InProgress => ActivityAction::ReviewStarted,
        _ => {
            if changes.recommendation.is_none() || changes.comments_to_author.is_none() {
                return Err(HelperError::Validation(
                    "A recommendation and comments to the author are required to complete a review".to_string(),
                ));
            }
            changes.completed_at = Some(now);
            ActivityAction::ReviewCompleted
        }
    };

    reviews_db_operations::update_review(&tx, review_id, next, &changes)?;

    match next {
        ReviewStatus::Completed => {
            notify(
                &tx,
                &review.reviewer_id,
                NotificationKind::ReviewCompleted,
                "Review Submitted",
                &format!("Thank you for completing your review of \"{}\".", submission.title),
                Some(&reviewer_review_link(review_id)),
            )?;
            if let Some(editor_id) = &review.invited_by {
                notify(
                    &tx,
                    editor_id,
                    NotificationKind::ReviewCompleted,
                    "Review Completed",
                    &format!("A review of \"{}\" has been completed.", submission.title),
                    Some(&editor_submission_link(&submission.id)),
                )?;
            }
        }
        ReviewStatus::Accepted | ReviewStatus::Declined => {
            if let Some(editor_id) = &review.invited_by {
                let verb = if next == ReviewStatus::Accepted { "accepted" } else { "declined" };
                notify(
                    &tx,
                    editor_id,
                    NotificationKind::ReviewResponse,
                    "Review Invitation Response",
                    &format!("A reviewer has {} the invitation to review \"{}\".", verb, submission.title),
                    Some(&editor_submission_link(&submission.id)),
                )?;
            }
        }
        _ => {}
    }

    notifications_db_operations::log_activity(
        &tx,
        &review.submission_id,
        &user.id,
        action,
        &json!({ "reviewId": review_id, "status": next, "recommendation": changes.recommendation }),
    )?;
    let updated = load_review(&tx, review_id)?;
    tx.commit()?;

    log::info!("Review {} moved from {} to {}", review_id, review.status, next);
    Ok(updated)
}

pub fn list_reviewers(pool: &DbPool, user: &AuthenticatedUser) -> Result<Vec<ReviewerCandidate>, HelperError> {
    user.require_editorial()?;
    let conn = get_conn(pool)?;
    Ok(users_db_operations::list_reviewer_candidates(&conn)?)
}

/// Marks every pending review past its due date as OVERDUE.
pub fn mark_overdue_reviews(conn: &Connection) -> Result<usize, HelperError> {
    Ok(reviews_db_operations::mark_overdue(conn, Utc::now())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::submission_helpers::{
        create_submission, record_decision, submit_revision, withdraw_submission, DecisionRequest,
        RevisionRequest, SubmissionRequest, WithdrawRequest,
    };
    use crate::helper::test_support::{add_user, as_caller, temp_pool};
    use crate::models::{ArticleType, EditorialDecision, ReviewTally, Role};

    fn invite(pool: &DbPool, editor: &AuthenticatedUser, submission_id: &str, reviewer: &AuthenticatedUser) -> Result<Review, HelperError> {
        assign_reviewers(
            pool,
            editor,
            AssignRequest {
                submission_id: Some(submission_id.to_string()),
                reviewer_ids: Some(vec![reviewer.id.clone()]),
            },
            21,
        )
        .map(|mut reviews| reviews.remove(0))
    }

    fn set_status(pool: &DbPool, reviewer: &AuthenticatedUser, review_id: &str, status: ReviewStatus) -> Result<Review, HelperError> {
        update_review(
            pool,
            reviewer,
            review_id,
            ReviewUpdateRequest {
                status: Some(status),
                ..Default::default()
            },
        )
    }

    fn complete(pool: &DbPool, reviewer: &AuthenticatedUser, review_id: &str) -> Result<Review, HelperError> {
        update_review(
            pool,
            reviewer,
            review_id,
            ReviewUpdateRequest {
                status: Some(ReviewStatus::Completed),
                recommendation: Some(Recommendation::MajorRevisions),
                comments_to_author: Some("Report the attrition.".to_string()),
                ..Default::default()
            },
        )
    }

    fn submit(pool: &DbPool, author: &AuthenticatedUser) -> String {
        create_submission(
            pool,
            author,
            SubmissionRequest {
                title: Some("Oral rehydration outcomes".to_string()),
                abstract_text: Some("Abstract".to_string()),
                article_type: Some(ArticleType::OriginalResearch),
                ..Default::default()
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn assignment_creates_one_invited_review_per_reviewer() {
        let (_dir, pool) = temp_pool();
        let author = as_caller(&add_user(&pool, "author@example.com", Role::Author));
        let editor = as_caller(&add_user(&pool, "editor@example.com", Role::Editor));
        let r1 = add_user(&pool, "r1@example.com", Role::Reviewer);
        let r2 = add_user(&pool, "r2@example.com", Role::Reviewer);
        let submission_id = submit(&pool, &author);

        let reviews = assign_reviewers(
            &pool,
            &editor,
            AssignRequest {
                submission_id: Some(submission_id.clone()),
                reviewer_ids: Some(vec![r1.id.clone(), r2.id.clone(), r1.id.clone()]),
            },
            21,
        )
        .unwrap();

        assert_eq!(reviews.len(), 2);
        for review in &reviews {
            assert_eq!(review.status, ReviewStatus::Invited);
            assert_eq!(review.due_date - review.invited_at, Duration::days(21));
            assert_eq!(review.invited_by.as_deref(), Some(editor.id.as_str()));
        }
        let conn = pool.get().unwrap();
        let submission = load_submission(&conn, &submission_id).unwrap();
        assert_eq!(submission.status, SubmissionStatus::UnderReview);
    }

    #[test]
    fn author_and_repeat_reviewers_are_rejected_without_partial_writes() {
        let (_dir, pool) = temp_pool();
        let author_user = add_user(&pool, "author@example.com", Role::Author);
        let author = as_caller(&author_user);
        let editor = as_caller(&add_user(&pool, "editor@example.com", Role::Editor));
        let r1 = add_user(&pool, "r1@example.com", Role::Reviewer);
        let submission_id = submit(&pool, &author);

        let err = assign_reviewers(
            &pool,
            &editor,
            AssignRequest {
                submission_id: Some(submission_id.clone()),
                reviewer_ids: Some(vec![r1.id.clone(), author_user.id.clone()]),
            },
            21,
        )
        .unwrap_err();
        assert!(matches!(err, HelperError::Validation(_)));

        let conn = pool.get().unwrap();
        assert!(reviews_db_operations::list_reviews_for_submission(&conn, &submission_id)
            .unwrap()
            .is_empty());
        assert_eq!(
            load_submission(&conn, &submission_id).unwrap().status,
            SubmissionStatus::Submitted
        );
    }

    #[test]
    fn only_the_assigned_reviewer_may_complete() {
        let (_dir, pool) = temp_pool();
        let author = as_caller(&add_user(&pool, "author@example.com", Role::Author));
        let editor = as_caller(&add_user(&pool, "editor@example.com", Role::Editor));
        let r1 = as_caller(&add_user(&pool, "r1@example.com", Role::Reviewer));
        let r2 = as_caller(&add_user(&pool, "r2@example.com", Role::Reviewer));
        let submission_id = submit(&pool, &author);
        let review = assign_reviewers(
            &pool,
            &editor,
            AssignRequest {
                submission_id: Some(submission_id),
                reviewer_ids: Some(vec![r1.id.clone()]),
            },
            21,
        )
        .unwrap()
        .remove(0);

        let accept = || ReviewUpdateRequest {
            status: Some(ReviewStatus::Accepted),
            ..Default::default()
        };
        assert!(matches!(
            update_review(&pool, &r2, &review.id, accept()),
            Err(HelperError::Forbidden(_))
        ));
        assert!(matches!(
            update_review(&pool, &editor, &review.id, accept()),
            Err(HelperError::Forbidden(_))
        ));

        let accepted = update_review(&pool, &r1, &review.id, accept()).unwrap();
        assert_eq!(accepted.status, ReviewStatus::Accepted);
        assert!(accepted.responded_at.is_some());

        let incomplete = ReviewUpdateRequest {
            status: Some(ReviewStatus::Completed),
            recommendation: Some(Recommendation::Accept),
            ..Default::default()
        };
        assert!(matches!(
            update_review(&pool, &r1, &review.id, incomplete),
            Err(HelperError::Validation(_))
        ));

        let completed = update_review(
            &pool,
            &r1,
            &review.id,
            ReviewUpdateRequest {
                status: Some(ReviewStatus::Completed),
                recommendation: Some(Recommendation::MinorRevisions),
                comments_to_author: Some("Clarify the sampling frame.".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(completed.status, ReviewStatus::Completed);
        assert!(completed.completed_at.is_some());
        assert_eq!(completed.recommendation, Some(Recommendation::MinorRevisions));
    }

    #[test]
    fn sweep_marks_only_late_pending_reviews() {
        let (_dir, pool) = temp_pool();
        let author = as_caller(&add_user(&pool, "author@example.com", Role::Author));
        let editor = add_user(&pool, "editor@example.com", Role::Editor);
        let r1 = add_user(&pool, "r1@example.com", Role::Reviewer);
        let submission_id = submit(&pool, &author);

        let conn = pool.get().unwrap();
        let past = Utc::now() - Duration::days(30);
        let late = reviews_db_operations::create_review(&conn, &submission_id, &r1.id, &editor.id, past, past + Duration::days(21)).unwrap();
        let on_time = reviews_db_operations::create_review(&conn, &submission_id, &editor.id, &editor.id, Utc::now(), Utc::now() + Duration::days(21)).unwrap();

        assert_eq!(mark_overdue_reviews(&conn).unwrap(), 1);
        assert_eq!(load_review(&conn, &late.id).unwrap().status, ReviewStatus::Overdue);
        assert_eq!(load_review(&conn, &on_time.id).unwrap().status, ReviewStatus::Invited);
    }

    #[test]
    fn report_fields_only_travel_with_completion() {
        let (_dir, pool) = temp_pool();
        let author = as_caller(&add_user(&pool, "author@example.com", Role::Author));
        let editor = as_caller(&add_user(&pool, "editor@example.com", Role::Editor));
        let r1 = as_caller(&add_user(&pool, "r1@example.com", Role::Reviewer));
        let submission_id = submit(&pool, &author);
        let review = invite(&pool, &editor, &submission_id, &r1).unwrap();

        let declining_with_verdict = ReviewUpdateRequest {
            status: Some(ReviewStatus::Declined),
            recommendation: Some(Recommendation::Reject),
            ..Default::default()
        };
        assert!(matches!(
            update_review(&pool, &r1, &review.id, declining_with_verdict),
            Err(HelperError::Validation(_))
        ));

        let conn = pool.get().unwrap();
        let stored = load_review(&conn, &review.id).unwrap();
        assert_eq!(stored.status, ReviewStatus::Invited);
        assert_eq!(stored.recommendation, None);
    }

    #[test]
    fn closed_manuscripts_refuse_late_reports() {
        let (_dir, pool) = temp_pool();
        let author = as_caller(&add_user(&pool, "author@example.com", Role::Author));
        let editor = as_caller(&add_user(&pool, "editor@example.com", Role::Editor));
        let r1 = as_caller(&add_user(&pool, "r1@example.com", Role::Reviewer));
        let submission_id = submit(&pool, &author);
        let review = invite(&pool, &editor, &submission_id, &r1).unwrap();

        {
            let conn = pool.get().unwrap();
            conn.execute("UPDATE reviews SET status = 'OVERDUE' WHERE id = ?1", [&review.id]).unwrap();
        }
        withdraw_submission(&pool, &author, &submission_id, WithdrawRequest::default()).unwrap();

        assert!(matches!(
            complete(&pool, &r1, &review.id),
            Err(HelperError::Conflict(_))
        ));
        let conn = pool.get().unwrap();
        assert_eq!(load_review(&conn, &review.id).unwrap().status, ReviewStatus::Overdue);
        let editor_notices: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND kind = 'REVIEW_COMPLETED'",
                [&editor.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(editor_notices, 0);
    }

    #[test]
    fn revised_manuscripts_start_a_fresh_review_round() {
        let (_dir, pool) = temp_pool();
        let author = as_caller(&add_user(&pool, "author@example.com", Role::Author));
        let editor = as_caller(&add_user(&pool, "editor@example.com", Role::Editor));
        let r1 = as_caller(&add_user(&pool, "r1@example.com", Role::Reviewer));
        let submission_id = submit(&pool, &author);

        let first = invite(&pool, &editor, &submission_id, &r1).unwrap();
        assert_eq!(first.round, 0);
        set_status(&pool, &r1, &first.id, ReviewStatus::Accepted).unwrap();
        complete(&pool, &r1, &first.id).unwrap();
        assert!(matches!(
            invite(&pool, &editor, &submission_id, &r1),
            Err(HelperError::Validation(_))
        ));

        record_decision(
            &pool,
            &editor,
            &submission_id,
            DecisionRequest {
                decision: Some(EditorialDecision::RevisionsRequested),
                comments: None,
            },
        )
        .unwrap();
        submit_revision(&pool, &author, &submission_id, RevisionRequest::default()).unwrap();

        {
            let conn = pool.get().unwrap();
            let tally = reviews_db_operations::review_tally(&conn, &submission_id).unwrap();
            assert_eq!(tally, ReviewTally::default());
            assert!(!tally.decision_ready());
        }

        let second = invite(&pool, &editor, &submission_id, &r1).unwrap();
        assert_eq!(second.round, 1);
        let conn = pool.get().unwrap();
        assert_eq!(
            load_submission(&conn, &submission_id).unwrap().status,
            SubmissionStatus::UnderReview
        );
        let tally = reviews_db_operations::review_tally(&conn, &submission_id).unwrap();
        assert_eq!((tally.total, tally.completed, tally.pending), (1, 0, 1));
    }
}
