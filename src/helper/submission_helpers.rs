use crate::helper::notification_helpers::{author_submission_link, notify};
use crate::helper::sanitization_helpers::{
    clean_author, clean_authors, clean_optional, clean_required, normalize_keywords,
};
use crate::helper::{begin_write, get_conn, HelperError};
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::{
    notifications_db_operations, reviews_db_operations, submissions_db_operations,
};
use crate::models::{
    ActivityAction, ArticleType, AuthorInfo, EditorialDecision, NewSubmission, NotificationKind,
    Review, ReviewTally, Role, Submission, SubmissionOverview, SubmissionStatus, SubmissionSummary,
};
use crate::DbPool;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub article_type: Option<ArticleType>,
    pub keywords: Option<Vec<String>>,
    pub manuscript_file_url: Option<String>,
    pub figures_urls: Option<Vec<String>>,
    pub word_count: Option<u32>,
    pub corresponding_author: Option<AuthorInfo>,
    pub co_authors: Option<Vec<AuthorInfo>>,
    pub ethical_approval_number: Option<String>,
    pub funding_info: Option<String>,
    pub conflicts_of_interest: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: Option<EditorialDecision>,
    pub comments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionRequest {
    pub manuscript_file_url: Option<String>,
    pub response_to_reviewers: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WithdrawRequest {
    pub reason: Option<String>,
}

/// Rejects any status write that is not in the lifecycle table.
pub fn ensure_transition(from: SubmissionStatus, to: SubmissionStatus) -> Result<(), HelperError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(HelperError::transition(from, to))
    }
}

pub(crate) fn load_submission(conn: &Connection, submission_id: &str) -> Result<Submission, HelperError> {
    submissions_db_operations::read_submission(conn, submission_id)?.ok_or(HelperError::NotFound("Submission"))
}

fn load_owned_submission(
    conn: &Connection,
    user: &AuthenticatedUser,
    submission_id: &str,
) -> Result<Submission, HelperError> {
    let submission = load_submission(conn, submission_id)?;
    if submission.author_id != user.id {
        log::warn!("User {} tried to modify submission {} they do not own", user.id, submission_id);
        return Err(HelperError::Forbidden("You are not the author of this submission".to_string()));
    }
    Ok(submission)
}

fn clean_urls(urls: Option<Vec<String>>) -> Option<Vec<String>> {
    let urls: Vec<String> = urls?.into_iter().filter_map(|u| clean_optional(Some(u))).collect();
    if urls.is_empty() {
        None
    } else {
        Some(urls)
    }
}

impl SubmissionRequest {
    fn into_new_submission(self, author_id: &str) -> Result<NewSubmission, HelperError> {
        let (Some(title), Some(abstract_text), Some(article_type)) =
            (self.title, self.abstract_text, self.article_type)
        else {
            return Err(HelperError::Validation(
                "Title, abstract and article type are required".to_string(),
            ));
        };

        Ok(NewSubmission {
            author_id: author_id.to_string(),
            title: clean_required("Title", Some(&title))?,
            abstract_text: clean_required("Abstract", Some(&abstract_text))?,
            article_type,
            keywords: normalize_keywords(self.keywords),
            manuscript_file_url: clean_optional(self.manuscript_file_url),
            figures_urls: clean_urls(self.figures_urls),
            word_count: self.word_count,
            corresponding_author: self.corresponding_author.map(clean_author).transpose()?,
            co_authors: clean_authors(self.co_authors)?,
            ethical_approval_number: clean_optional(self.ethical_approval_number),
            funding_info: clean_optional(self.funding_info),
            conflicts_of_interest: clean_optional(self.conflicts_of_interest),
        })
    }
}

/// Creates a SUBMITTED manuscript with its receipt notification and activity entry.
pub fn create_submission(
    pool: &DbPool,
    user: &AuthenticatedUser,
    request: SubmissionRequest,
) -> Result<Submission, HelperError> {
    user.require_role(&[Role::Author, Role::Admin])?;
    let new_submission = request.into_new_submission(&user.id)?;

    let mut conn = get_conn(pool)?;
    let tx = begin_write(&mut conn)?;
    let submission = submissions_db_operations::create_submission(&tx, &new_submission)?;
    notify(
        &tx,
        &user.id,
        NotificationKind::SubmissionReceived,
        "Submission Received",
        &format!("Your manuscript \"{}\" has been successfully submitted.", submission.title),
        Some(&author_submission_link(&submission.id)),
    )?;
    notifications_db_operations::log_activity(
        &tx,
        &submission.id,
        &user.id,
        ActivityAction::SubmissionCreated,
        &json!({ "title": submission.title, "articleType": submission.article_type }),
    )?;
    tx.commit()?;

    log::info!("Submission {} created by {}", submission.id, user.id);
    Ok(submission)
}

pub fn list_own_submissions(pool: &DbPool, user: &AuthenticatedUser) -> Result<Vec<SubmissionSummary>, HelperError> {
    let conn = get_conn(pool)?;
    Ok(submissions_db_operations::list_submissions_for_author(&conn, &user.id)?)
}

/// Owner, editorial staff and reviewers assigned to the manuscript may read it.
pub fn get_submission(pool: &DbPool, user: &AuthenticatedUser, submission_id: &str) -> Result<Submission, HelperError> {
    let conn = get_conn(pool)?;
    let submission = load_submission(&conn, submission_id)?;
    if submission.author_id == user.id
        || user.is_editorial()
        || reviews_db_operations::is_assigned_reviewer(&conn, submission_id, &user.id)?
    {
        Ok(submission)
    } else {
        Err(HelperError::Forbidden("You do not have access to this submission".to_string()))
    }
}

pub fn list_overviews(
    pool: &DbPool,
    user: &AuthenticatedUser,
    status: Option<SubmissionStatus>,
) -> Result<Vec<SubmissionOverview>, HelperError> {
    user.require_editorial()?;
    let conn = get_conn(pool)?;
    Ok(submissions_db_operations::list_submission_overviews(&conn, status)?)
}

pub fn list_submission_reviews(
    pool: &DbPool,
    user: &AuthenticatedUser,
    submission_id: &str,
) -> Result<(Vec<Review>, ReviewTally), HelperError> {
    user.require_editorial()?;
    let conn = get_conn(pool)?;
    load_submission(&conn, submission_id)?;
    let reviews = reviews_db_operations::list_reviews_for_submission(&conn, submission_id)?;
    let tally = reviews_db_operations::review_tally(&conn, submission_id)?;
    Ok((reviews, tally))
}

/// Records an editorial decision. Requires at least one completed review and
/// no review still owed by a reviewer.
pub fn record_decision(
    pool: &DbPool,
    user: &AuthenticatedUser,
    submission_id: &str,
    request: DecisionRequest,
) -> Result<Submission, HelperError> {
    user.require_editorial()?;
    let decision = request
        .decision
        .ok_or_else(|| HelperError::Validation("Decision is required".to_string()))?;
    let comments = clean_optional(request.comments);
    let target = decision.target_status();

    let mut conn = get_conn(pool)?;
    let tx = begin_write(&mut conn)?;
    let submission = load_submission(&tx, submission_id)?;
    ensure_transition(submission.status, target)?;

    let tally = reviews_db_operations::review_tally(&tx, submission_id)?;
    if !tally.decision_ready() {
        return Err(HelperError::Conflict(format!(
            "A decision needs at least one completed review and none outstanding ({} completed, {} pending)",
            tally.completed, tally.pending
        )));
    }

    submissions_db_operations::update_status(&tx, submission_id, target)?;

    let mut message = format!(
        "Your submission \"{}\" has been {}.",
        submission.title,
        decision.outcome_phrase()
    );
    if let Some(comments) = &comments {
        message.push_str("\n\nEditor comments: ");
        message.push_str(comments);
    }
    let reports = reviews_db_operations::list_current_round_reports(&tx, submission_id)?;
    for (number, report) in reports.iter().enumerate() {
        message.push_str(&format!("\n\nReviewer {}", number + 1));
        if let Some(recommendation) = report.recommendation {
            message.push_str(&format!(" ({})", recommendation.label()));
        }
        message.push_str(": ");
        message.push_str(report.comments_to_author.as_deref().unwrap_or_default());
    }
    notify(
        &tx,
        &submission.author_id,
        NotificationKind::DecisionMade,
        &format!("Editorial Decision: {}", decision.label()),
        &message,
        Some(&author_submission_link(submission_id)),
    )?;
    notifications_db_operations::log_activity(
        &tx,
        submission_id,
        &user.id,
        ActivityAction::DecisionMade,
        &json!({ "decision": decision, "comments": comments }),
    )?;
    let updated = load_submission(&tx, submission_id)?;
    tx.commit()?;

    log::info!("Decision {} recorded on submission {} by {}", decision, submission_id, user.id);
    Ok(updated)
}

/// Resubmits a manuscript that was returned for revisions.
pub fn submit_revision(
    pool: &DbPool,
    user: &AuthenticatedUser,
    submission_id: &str,
    request: RevisionRequest,
) -> Result<Submission, HelperError> {
    let manuscript_file_url = clean_optional(request.manuscript_file_url);
    let response = clean_optional(request.response_to_reviewers);

    let mut conn = get_conn(pool)?;
    let tx = begin_write(&mut conn)?;
    let submission = load_owned_submission(&tx, user, submission_id)?;
    ensure_transition(submission.status, SubmissionStatus::RevisedSubmitted)?;

    submissions_db_operations::record_revision(&tx, submission_id, manuscript_file_url.as_deref())?;
    let updated = load_submission(&tx, submission_id)?;

    notify(
        &tx,
        &user.id,
        NotificationKind::RevisionReceived,
        "Revision Received",
        &format!("Your revised manuscript \"{}\" has been received.", submission.title),
        Some(&author_submission_link(submission_id)),
    )?;
    notifications_db_operations::log_activity(
        &tx,
        submission_id,
        &user.id,
        ActivityAction::RevisionSubmitted,
        &json!({
            "revision": updated.revision_count,
            "manuscriptFileUrl": manuscript_file_url,
            "responseToReviewers": response,
        }),
    )?;
    tx.commit()?;

    log::info!("Revision {} submitted for {}", updated.revision_count, submission_id);
    Ok(updated)
}

/// Withdraws a manuscript at the author's request. Existing reviews stay as history.
pub fn withdraw_submission(
    pool: &DbPool,
    user: &AuthenticatedUser,
    submission_id: &str,
    request: WithdrawRequest,
) -> Result<Submission, HelperError> {
    let reason = clean_optional(request.reason);

    let mut conn = get_conn(pool)?;
    let tx = begin_write(&mut conn)?;
    let submission = load_owned_submission(&tx, user, submission_id)?;
    ensure_transition(submission.status, SubmissionStatus::Withdrawn)?;

    submissions_db_operations::update_status(&tx, submission_id, SubmissionStatus::Withdrawn)?;
    notify(
        &tx,
        &user.id,
        NotificationKind::SubmissionWithdrawn,
        "Submission Withdrawn",
        &format!("Your manuscript \"{}\" has been withdrawn.", submission.title),
        Some(&author_submission_link(submission_id)),
    )?;
    // Reviewers still working on it are told to stop.
    for review in reviews_db_operations::list_reviews_for_submission(&tx, submission_id)? {
        if review.status.is_pending() {
            notify(
                &tx,
                &review.reviewer_id,
                NotificationKind::SubmissionWithdrawn,
                "Submission Withdrawn",
                &format!("The manuscript \"{}\" you were reviewing has been withdrawn.", submission.title),
                None,
            )?;
        }
    }
    notifications_db_operations::log_activity(
        &tx,
        submission_id,
        &user.id,
        ActivityAction::SubmissionWithdrawn,
        &json!({ "previousStatus": submission.status, "reason": reason }),
    )?;
    let updated = load_submission(&tx, submission_id)?;
    tx.commit()?;

    log::info!("Submission {} withdrawn by its author", submission_id);
    Ok(updated)
}
