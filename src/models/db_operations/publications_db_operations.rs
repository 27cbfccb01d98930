use crate::models::db_operations::{from_json_column, parse_timestamp, timestamp};
use crate::models::{Article, ArticleSummary, AuthorInfo, Publication, SubmissionStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Row};
use uuid::Uuid;

const PUBLICATION_COLUMNS: &str =
    "p.id, p.submission_id, p.doi, p.volume, p.issue, p.pages, p.published_date, p.views_count, p.downloads_count";

fn map_publication(row: &Row) -> rusqlite::Result<Publication> {
    let published_date: String = row.get(6)?;
    Ok(Publication {
        id: row.get(0)?,
        submission_id: row.get(1)?,
        doi: row.get(2)?,
        volume: row.get(3)?,
        issue: row.get(4)?,
        pages: row.get(5)?,
        published_date: parse_timestamp(6, &published_date)?,
        views_count: row.get(7)?,
        downloads_count: row.get(8)?,
    })
}

pub struct NewPublication<'a> {
    pub submission_id: &'a str,
    pub doi: &'a str,
    pub volume: Option<u32>,
    pub issue: Option<u32>,
    pub pages: Option<&'a str>,
    pub published_date: DateTime<Utc>,
}

pub fn create_publication(conn: &Connection, new: &NewPublication) -> Result<Publication, RusqliteError> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO publications (id, submission_id, doi, volume, issue, pages, published_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            new.submission_id,
            new.doi,
            new.volume,
            new.issue,
            new.pages,
            timestamp(new.published_date),
        ],
    )?;

    read_publication(conn, &id)?.ok_or(RusqliteError::QueryReturnedNoRows)
}

/// Position of the next publication within the given year, starting at 1.
pub fn next_sequence_for_year(conn: &Connection, year: i32) -> Result<u32, RusqliteError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM publications WHERE substr(published_date, 1, 4) = ?1",
        [format!("{:04}", year)],
        |row| row.get(0),
    )?;
    Ok(count + 1)
}

pub fn read_publication(conn: &Connection, publication_id: &str) -> Result<Option<Publication>, RusqliteError> {
    conn.query_row(
        &format!("SELECT {} FROM publications p WHERE p.id = ?1", PUBLICATION_COLUMNS),
        [publication_id],
        map_publication,
    )
    .optional()
}

pub fn read_publication_by_submission(
    conn: &Connection,
    submission_id: &str,
) -> Result<Option<Publication>, RusqliteError> {
    conn.query_row(
        &format!("SELECT {} FROM publications p WHERE p.submission_id = ?1", PUBLICATION_COLUMNS),
        [submission_id],
        map_publication,
    )
    .optional()
}

/// Reads a publication together with its manuscript, but only while the manuscript is PUBLISHED.
pub fn read_article(conn: &Connection, publication_id: &str) -> Result<Option<Article>, RusqliteError> {
    conn.query_row(
        &format!(
            "SELECT {}, s.title, s.abstract, s.article_type, s.keywords, s.co_authors,
                    s.corresponding_author, s.manuscript_file_url, s.funding_info, s.conflicts_of_interest,
                    u.full_name, u.email, u.institution, u.orcid
             FROM publications p
             JOIN submissions s ON s.id = p.submission_id
             JOIN users u ON u.id = s.author_id
             WHERE p.id = ?1 AND s.status = ?2",
            PUBLICATION_COLUMNS
        ),
        params![publication_id, SubmissionStatus::Published],
        |row| {
            let submitting_author = AuthorInfo {
                name: row.get(18)?,
                email: row.get(19)?,
                institution: row.get(20)?,
                orcid: row.get(21)?,
            };
            let co_authors: Vec<AuthorInfo> = from_json_column(13, row.get(13)?)?.unwrap_or_default();
            let mut authors = Vec::with_capacity(co_authors.len() + 1);
            authors.push(submitting_author);
            authors.extend(co_authors);

            Ok(Article {
                publication: map_publication(row)?,
                title: row.get(9)?,
                abstract_text: row.get(10)?,
                article_type: row.get(11)?,
                keywords: from_json_column(12, row.get(12)?)?.unwrap_or_default(),
                authors,
                corresponding_author: from_json_column(14, row.get(14)?)?,
                manuscript_file_url: row.get(15)?,
                funding_info: row.get(16)?,
                conflicts_of_interest: row.get(17)?,
            })
        },
    )
    .optional()
}

#[derive(Debug, Default, Clone)]
pub struct ArticleFilter {
    pub volume: Option<u32>,
    pub issue: Option<u32>,
    pub year: Option<i32>,
    pub keyword: Option<String>,
}

/// Published articles, newest first.
pub fn list_articles(conn: &Connection, filter: &ArticleFilter) -> Result<Vec<ArticleSummary>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, s.title, s.abstract, s.article_type, s.keywords, u.full_name
         FROM publications p
         JOIN submissions s ON s.id = p.submission_id
         JOIN users u ON u.id = s.author_id
         WHERE s.status = ?1
           AND (?2 IS NULL OR p.volume = ?2)
           AND (?3 IS NULL OR p.issue = ?3)
           AND (?4 IS NULL OR substr(p.published_date, 1, 4) = ?4)
         ORDER BY p.published_date DESC, p.rowid DESC",
        PUBLICATION_COLUMNS
    ))?;
    let year = filter.year.map(|y| format!("{:04}", y));
    let rows = stmt.query_map(
        params![SubmissionStatus::Published, filter.volume, filter.issue, year],
        |row| {
            Ok(ArticleSummary {
                publication: map_publication(row)?,
                title: row.get(9)?,
                abstract_text: row.get(10)?,
                article_type: row.get(11)?,
                keywords: from_json_column(12, row.get(12)?)?.unwrap_or_default(),
                author_name: row.get(13)?,
            })
        },
    )?;
    let articles = rows.collect::<Result<Vec<_>, _>>()?;

    // Keywords live in a JSON column, so the keyword match happens here.
    Ok(match filter.keyword.as_deref().map(str::to_lowercase) {
        Some(wanted) => articles
            .into_iter()
            .filter(|a| a.keywords.iter().any(|k| k.to_lowercase() == wanted))
            .collect(),
        None => articles,
    })
}

pub fn increment_views(conn: &Connection, publication_id: &str) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE publications SET views_count = views_count + 1 WHERE id = ?1",
        [publication_id],
    )
}

pub fn increment_downloads(conn: &Connection, publication_id: &str) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE publications SET downloads_count = downloads_count + 1 WHERE id = ?1",
        [publication_id],
    )
}
