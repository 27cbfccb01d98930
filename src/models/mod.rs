use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod db_operations;

#[derive(Error, Debug)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

/// Gives a fieldless enum its SCREAMING_SNAKE text form, both for serde (via the
/// derive attributes on the enum) and for the SQLite columns that store it.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: UnknownVariant| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Author,
    Reviewer,
    Editor,
    Admin,
}

text_enum!(Role {
    Author => "AUTHOR",
    Reviewer => "REVIEWER",
    Editor => "EDITOR",
    Admin => "ADMIN",
});

impl Role {
    /// Editorial roles are provisioned by an operator, never through registration.
    pub fn can_self_register(&self) -> bool {
        matches!(self, Role::Author | Role::Reviewer)
    }

    pub fn is_editorial(&self) -> bool {
        matches!(self, Role::Editor | Role::Admin)
    }

    pub fn can_review(&self) -> bool {
        matches!(self, Role::Reviewer | Role::Editor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleType {
    OriginalResearch,
    SystematicReview,
    CaseReport,
    BriefCommunication,
    Commentary,
}

text_enum!(ArticleType {
    OriginalResearch => "ORIGINAL_RESEARCH",
    SystematicReview => "SYSTEMATIC_REVIEW",
    CaseReport => "CASE_REPORT",
    BriefCommunication => "BRIEF_COMMUNICATION",
    Commentary => "COMMENTARY",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Submitted,
    UnderReview,
    RevisionsRequested,
    RevisedSubmitted,
    Accepted,
    Rejected,
    Published,
    Withdrawn,
}

text_enum!(SubmissionStatus {
    Submitted => "SUBMITTED",
    UnderReview => "UNDER_REVIEW",
    RevisionsRequested => "REVISIONS_REQUESTED",
    RevisedSubmitted => "REVISED_SUBMITTED",
    Accepted => "ACCEPTED",
    Rejected => "REJECTED",
    Published => "PUBLISHED",
    Withdrawn => "WITHDRAWN",
});

impl SubmissionStatus {
    /// The manuscript lifecycle. Anything not listed here is an illegal write.
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        match self {
            Submitted => matches!(next, UnderReview | Withdrawn),
            UnderReview => matches!(
                next,
                UnderReview | Accepted | RevisionsRequested | Rejected | Withdrawn
            ),
            RevisionsRequested => matches!(next, RevisedSubmitted | Withdrawn),
            RevisedSubmitted => matches!(
                next,
                UnderReview | Accepted | RevisionsRequested | Rejected | Withdrawn
            ),
            Accepted => matches!(next, Published),
            Rejected | Published | Withdrawn => false,
        }
    }

    /// Reviewer responses are only taken while the editorial outcome is still open.
    pub fn accepts_review_work(self) -> bool {
        matches!(
            self,
            SubmissionStatus::UnderReview
                | SubmissionStatus::RevisionsRequested
                | SubmissionStatus::RevisedSubmitted
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Invited,
    Accepted,
    Declined,
    InProgress,
    Completed,
    Overdue,
}

text_enum!(ReviewStatus {
    Invited => "INVITED",
    Accepted => "ACCEPTED",
    Declined => "DECLINED",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Overdue => "OVERDUE",
});

impl ReviewStatus {
    pub fn can_transition_to(self, next: ReviewStatus) -> bool {
        use ReviewStatus::*;
        match self {
            Invited => matches!(next, Accepted | Declined | Overdue),
            Accepted => matches!(next, InProgress | Completed | Overdue),
            InProgress => matches!(next, Completed | Overdue),
            Overdue => matches!(next, Completed | Declined),
            Declined | Completed => false,
        }
    }

    /// Reviews still owed by a reviewer; these block an editorial decision.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            ReviewStatus::Invited | ReviewStatus::Accepted | ReviewStatus::InProgress
        )
    }

    /// OVERDUE comes only from the deadline sweep and INVITED only from assignment.
    pub fn reviewer_may_request(self) -> bool {
        !matches!(self, ReviewStatus::Invited | ReviewStatus::Overdue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Accept,
    MinorRevisions,
    MajorRevisions,
    Reject,
}

text_enum!(Recommendation {
    Accept => "ACCEPT",
    MinorRevisions => "MINOR_REVISIONS",
    MajorRevisions => "MAJOR_REVISIONS",
    Reject => "REJECT",
});

impl Recommendation {
    pub fn label(self) -> &'static str {
        match self {
            Recommendation::Accept => "Accept",
            Recommendation::MinorRevisions => "Minor revisions",
            Recommendation::MajorRevisions => "Major revisions",
            Recommendation::Reject => "Reject",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditorialDecision {
    Accepted,
    RevisionsRequested,
    Rejected,
}

text_enum!(EditorialDecision {
    Accepted => "ACCEPTED",
    RevisionsRequested => "REVISIONS_REQUESTED",
    Rejected => "REJECTED",
});

impl EditorialDecision {
    pub fn target_status(self) -> SubmissionStatus {
        match self {
            EditorialDecision::Accepted => SubmissionStatus::Accepted,
            EditorialDecision::RevisionsRequested => SubmissionStatus::RevisionsRequested,
            EditorialDecision::Rejected => SubmissionStatus::Rejected,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EditorialDecision::Accepted => "Accepted",
            EditorialDecision::RevisionsRequested => "Revisions Requested",
            EditorialDecision::Rejected => "Rejected",
        }
    }

    pub fn outcome_phrase(self) -> &'static str {
        match self {
            EditorialDecision::Accepted => "accepted for publication",
            EditorialDecision::RevisionsRequested => "returned to you for revisions",
            EditorialDecision::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Welcome,
    SubmissionReceived,
    ReviewInvitation,
    ReviewResponse,
    ReviewCompleted,
    DecisionMade,
    RevisionReceived,
    SubmissionWithdrawn,
    ArticlePublished,
}

text_enum!(NotificationKind {
    Welcome => "WELCOME",
    SubmissionReceived => "SUBMISSION_RECEIVED",
    ReviewInvitation => "REVIEW_INVITATION",
    ReviewResponse => "REVIEW_RESPONSE",
    ReviewCompleted => "REVIEW_COMPLETED",
    DecisionMade => "DECISION_MADE",
    RevisionReceived => "REVISION_RECEIVED",
    SubmissionWithdrawn => "SUBMISSION_WITHDRAWN",
    ArticlePublished => "ARTICLE_PUBLISHED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    SubmissionCreated,
    ReviewersAssigned,
    ReviewAccepted,
    ReviewDeclined,
    ReviewStarted,
    ReviewCompleted,
    DecisionMade,
    RevisionSubmitted,
    SubmissionWithdrawn,
    ArticlePublished,
}

text_enum!(ActivityAction {
    SubmissionCreated => "SUBMISSION_CREATED",
    ReviewersAssigned => "REVIEWERS_ASSIGNED",
    ReviewAccepted => "REVIEW_ACCEPTED",
    ReviewDeclined => "REVIEW_DECLINED",
    ReviewStarted => "REVIEW_STARTED",
    ReviewCompleted => "REVIEW_COMPLETED",
    DecisionMade => "DECISION_MADE",
    RevisionSubmitted => "REVISION_SUBMITTED",
    SubmissionWithdrawn => "SUBMISSION_WITHDRAWN",
    ArticlePublished => "ARTICLE_PUBLISHED",
});

// --- Records ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub institution: Option<String>,
    pub country: String,
    pub orcid: Option<String>,
    pub specialties: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
        }
    }
}

/// Row shape returned by the reviewer picker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerCandidate {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub specialties: Vec<String>,
}

/// A corresponding or co-author as typed into the submission form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInfo {
    pub name: String,
    pub email: Option<String>,
    pub institution: Option<String>,
    pub orcid: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub author_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Option<Vec<String>>,
    pub article_type: ArticleType,
    pub status: SubmissionStatus,
    pub manuscript_file_url: Option<String>,
    pub figures_urls: Option<Vec<String>>,
    pub word_count: Option<u32>,
    pub corresponding_author: Option<AuthorInfo>,
    pub co_authors: Option<Vec<AuthorInfo>>,
    pub ethical_approval_number: Option<String>,
    pub funding_info: Option<String>,
    pub conflicts_of_interest: Option<String>,
    pub revision_count: u32,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a submission; the store assigns id, status and timestamps.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub author_id: String,
    pub title: String,
    pub abstract_text: String,
    pub keywords: Option<Vec<String>>,
    pub article_type: ArticleType,
    pub manuscript_file_url: Option<String>,
    pub figures_urls: Option<Vec<String>>,
    pub word_count: Option<u32>,
    pub corresponding_author: Option<AuthorInfo>,
    pub co_authors: Option<Vec<AuthorInfo>>,
    pub ethical_approval_number: Option<String>,
    pub funding_info: Option<String>,
    pub conflicts_of_interest: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub id: String,
    pub title: String,
    pub article_type: ArticleType,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editor dashboard row: a submission with its review tally.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOverview {
    pub id: String,
    pub title: String,
    pub article_type: ArticleType,
    pub status: SubmissionStatus,
    pub author_name: String,
    pub submitted_at: DateTime<Utc>,
    pub reviews_total: u32,
    pub reviews_completed: u32,
    pub reviews_pending: u32,
    pub decision_ready: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub submission_id: String,
    pub reviewer_id: String,
    pub invited_by: Option<String>,
    pub status: ReviewStatus,
    pub recommendation: Option<Recommendation>,
    pub comments_to_author: Option<String>,
    pub comments_to_editor: Option<String>,
    pub confidential_comments: Option<String>,
    pub review_quality: Option<serde_json::Value>,
    pub invited_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: DateTime<Utc>,
    /// The manuscript revision this review was invited for; 0 is the original submission.
    pub round: u32,
}

/// A review as listed on the reviewer's own dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAssignment {
    #[serde(flatten)]
    pub review: Review,
    pub submission_title: String,
}

/// Tallies used to decide whether an editorial decision may be recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewTally {
    pub total: u32,
    pub completed: u32,
    pub pending: u32,
}

impl ReviewTally {
    pub fn decision_ready(&self) -> bool {
        self.completed > 0 && self.pending == 0
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: String,
    pub submission_id: String,
    pub doi: String,
    pub volume: Option<u32>,
    pub issue: Option<u32>,
    pub pages: Option<String>,
    pub published_date: DateTime<Utc>,
    pub views_count: i64,
    pub downloads_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    #[serde(flatten)]
    pub publication: Publication,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub article_type: ArticleType,
    pub keywords: Vec<String>,
    pub author_name: String,
}

/// The public article page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(flatten)]
    pub publication: Publication,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub article_type: ArticleType,
    pub keywords: Vec<String>,
    pub authors: Vec<AuthorInfo>,
    pub corresponding_author: Option<AuthorInfo>,
    pub manuscript_file_url: Option<String>,
    pub funding_info: Option<String>,
    pub conflicts_of_interest: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub submission_id: String,
    pub user_id: String,
    pub action: ActivityAction,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
