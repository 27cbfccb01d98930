use crate::helper::notification_helpers::{author_submission_link, notify};
use crate::helper::sanitization_helpers::clean_optional;
use crate::helper::submission_helpers::{ensure_transition, load_submission};
use crate::helper::{begin_write, get_conn, HelperError};
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::publications_db_operations::{self, ArticleFilter, NewPublication};
use crate::models::db_operations::{notifications_db_operations, submissions_db_operations};
use crate::models::{ActivityAction, Article, ArticleSummary, NotificationKind, Publication, SubmissionStatus};
use crate::DbPool;
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
pub struct PublishRequest {
    pub volume: Option<u32>,
    pub issue: Option<u32>,
    pub pages: Option<String>,
}

/// `<prefix>.<year>.<sequence>` with a four-digit, zero-padded sequence.
pub fn format_doi(prefix: &str, year: i32, sequence: u32) -> String {
    format!("{}.{}.{:04}", prefix.trim_end_matches('.'), year, sequence)
}

/// Publishes an accepted manuscript: one Publication row, the PUBLISHED status,
/// the author's notification and the activity entry land together.
pub fn publish_submission(
    pool: &DbPool,
    user: &AuthenticatedUser,
    submission_id: &str,
    request: PublishRequest,
    doi_prefix: &str,
) -> Result<Publication, HelperError> {
    user.require_editorial()?;
    let pages = clean_optional(request.pages);

    let mut conn = get_conn(pool)?;
    let tx = begin_write(&mut conn)?;
    let submission = load_submission(&tx, submission_id)?;
    ensure_transition(submission.status, SubmissionStatus::Published)?;
    if publications_db_operations::read_publication_by_submission(&tx, submission_id)?.is_some() {
        return Err(HelperError::Conflict("Submission already has a publication".to_string()));
    }

    let published_date = Utc::now();
    let sequence = publications_db_operations::next_sequence_for_year(&tx, published_date.year())?;
    let doi = format_doi(doi_prefix, published_date.year(), sequence);
    let publication = publications_db_operations::create_publication(
        &tx,
        &NewPublication {
            submission_id,
            doi: &doi,
            volume: request.volume,
            issue: request.issue,
            pages: pages.as_deref(),
            published_date,
        },
    )?;
    submissions_db_operations::update_status(&tx, submission_id, SubmissionStatus::Published)?;

    notify(
        &tx,
        &submission.author_id,
        NotificationKind::ArticlePublished,
        "Article Published",
        &format!("Your article \"{}\" has been published with DOI {}.", submission.title, doi),
        Some(&author_submission_link(submission_id)),
    )?;
    notifications_db_operations::log_activity(
        &tx,
        submission_id,
        &user.id,
        ActivityAction::ArticlePublished,
        &json!({ "publicationId": publication.id, "doi": doi }),
    )?;
    tx.commit()?;

    log::info!("Submission {} published as {}", submission_id, publication.doi);
    Ok(publication)
}

pub fn list_articles(pool: &DbPool, filter: &ArticleFilter) -> Result<Vec<ArticleSummary>, HelperError> {
    let conn = get_conn(pool)?;
    Ok(publications_db_operations::list_articles(&conn, filter)?)
}

/// Reads a published article, counting the view. Every read counts.
/// The increment runs first so the transaction holds the write lock from the
/// start; an unpublished or unknown id rolls it back.
pub fn view_article(pool: &DbPool, publication_id: &str) -> Result<Article, HelperError> {
    let mut conn = get_conn(pool)?;
    let tx = begin_write(&mut conn)?;
    publications_db_operations::increment_views(&tx, publication_id)?;
    let article = publications_db_operations::read_article(&tx, publication_id)?
        .ok_or(HelperError::NotFound("Article"))?;
    tx.commit()?;
    Ok(article)
}

/// Counts a download and hands back the manuscript reference with the new count.
pub fn download_article(pool: &DbPool, publication_id: &str) -> Result<(String, i64), HelperError> {
    let mut conn = get_conn(pool)?;
    let tx = begin_write(&mut conn)?;
    publications_db_operations::increment_downloads(&tx, publication_id)?;
    let article = publications_db_operations::read_article(&tx, publication_id)?
        .ok_or(HelperError::NotFound("Article"))?;
    let url = article
        .manuscript_file_url
        .ok_or(HelperError::NotFound("Manuscript file"))?;
    tx.commit()?;
    Ok((url, article.publication.downloads_count))
}
