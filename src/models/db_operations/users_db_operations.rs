use crate::models::db_operations::{from_json_column, parse_timestamp, timestamp};
use crate::models::{ReviewerCandidate, Role, User};
use bcrypt::{hash, verify, BcryptError};
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Row};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, email, full_name, role, institution, country, orcid, specialties, created_at";

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: &'a str,
    pub role: Role,
    pub institution: Option<&'a str>,
    pub country: &'a str,
    pub orcid: Option<&'a str>,
    pub specialties: &'a [String],
}

fn map_user(row: &Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(8)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role: row.get(3)?,
        institution: row.get(4)?,
        country: row.get(5)?,
        orcid: row.get(6)?,
        specialties: from_json_column(7, row.get(7)?)?.unwrap_or_default(),
        created_at: parse_timestamp(8, &created_at)?,
    })
}

/// Inserts a user, hashing the password with the given bcrypt cost. The email is
/// expected to be normalized already; the UNIQUE constraint is the last line of defence.
pub fn create_user(conn: &Connection, new_user: &NewUser, hash_cost: u32) -> Result<User, RusqliteError> {
    let hashed_password = hash(new_user.password, hash_cost).map_err(bcrypt_to_rusqlite_error)?;
    let id = Uuid::new_v4().to_string();
    let specialties = if new_user.specialties.is_empty() {
        None
    } else {
        Some(serde_json::to_string(new_user.specialties).map_err(|e| RusqliteError::ToSqlConversionFailure(Box::new(e)))?)
    };

    conn.execute(
        "INSERT INTO users (id, email, password_hash, full_name, role, institution, country, orcid, specialties, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            id,
            new_user.email,
            hashed_password,
            new_user.full_name,
            new_user.role,
            new_user.institution,
            new_user.country,
            new_user.orcid,
            specialties,
            timestamp(Utc::now()),
        ],
    )?;

    read_user_by_id(conn, &id)?.ok_or(RusqliteError::QueryReturnedNoRows)
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool, RusqliteError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        [email],
        |row| row.get(0),
    )
}

pub fn read_user_by_id(conn: &Connection, user_id: &str) -> Result<Option<User>, RusqliteError> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        [user_id],
        map_user,
    )
    .optional()
}

pub fn read_all_users(conn: &Connection, role: Option<Role>) -> Result<Vec<User>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users WHERE (?1 IS NULL OR role = ?1) ORDER BY created_at, rowid",
        USER_COLUMNS
    ))?;
    let rows = stmt.query_map(params![role], map_user)?;
    rows.collect()
}

/// Users who may be invited to review, alphabetically by name.
pub fn list_reviewer_candidates(conn: &Connection) -> Result<Vec<ReviewerCandidate>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name, email, specialties FROM users
         WHERE role IN ('REVIEWER', 'EDITOR') ORDER BY full_name ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ReviewerCandidate {
            id: row.get(0)?,
            full_name: row.get(1)?,
            email: row.get(2)?,
            specialties: from_json_column(3, row.get(3)?)?.unwrap_or_default(),
        })
    })?;
    rows.collect()
}

pub fn count_users(conn: &Connection) -> Result<i64, RusqliteError> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
}

/// Returns the user when the email exists and the password matches its hash.
pub fn verify_credentials(conn: &Connection, email: &str, password: &str) -> Result<Option<User>, RusqliteError> {
    let stored: Option<(String, String)> = conn
        .query_row(
            "SELECT id, password_hash FROM users WHERE email = ?1",
            [email],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match stored {
        Some((id, hash)) if verify(password, &hash).unwrap_or(false) => read_user_by_id(conn, &id),
        _ => Ok(None),
    }
}

pub fn update_password(conn: &Connection, email: &str, new_password: &str, hash_cost: u32) -> Result<usize, RusqliteError> {
    let hashed_password = hash(new_password, hash_cost).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE email = ?2",
        params![hashed_password, email],
    )
}
