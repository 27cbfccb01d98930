use crate::helper::notification_helpers::notify;
use crate::helper::sanitization_helpers::{clean_optional, clean_required};
use crate::helper::{begin_write, get_conn, HelperError};
use crate::models::db_operations::users_db_operations::{self, NewUser};
use crate::models::{NotificationKind, Role, User};
use crate::DbPool;
use regex::Regex;
use rusqlite::{Connection, ErrorCode};
use serde::Deserialize;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"));

/// Registration body. Everything is optional at the serde level so that a
/// missing field yields a readable validation message instead of a parse error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub institution: Option<String>,
    pub country: Option<String>,
    pub orcid: Option<String>,
    pub specialties: Option<Vec<String>>,
}

/// A registration that passed validation.
#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub institution: Option<String>,
    pub country: String,
    pub orcid: Option<String>,
    pub specialties: Vec<String>,
}

/// At least 8 characters with an uppercase letter, a lowercase letter and a digit.
pub fn validate_password(password: &str) -> Result<(), HelperError> {
    if password.chars().count() < 8 {
        return Err(HelperError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(HelperError::Validation(
            "Password must contain an uppercase letter, a lowercase letter and a number".to_string(),
        ));
    }
    Ok(())
}

/// Trims and lower-cases an email, rejecting anything not shaped like `local@domain.tld`.
pub fn normalize_email(email: &str) -> Result<String, HelperError> {
    let email = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(HelperError::Validation("Invalid email address".to_string()));
    }
    Ok(email)
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, HelperError> {
        let (Some(email), Some(password), Some(full_name), Some(role), Some(country)) =
            (self.email, self.password, self.full_name, self.role, self.country)
        else {
            return Err(HelperError::Validation("Missing required fields".to_string()));
        };

        let email = normalize_email(&email)?;
        validate_password(&password)?;
        let role: Role = role.trim().parse()?;

        let specialties = self
            .specialties
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| clean_optional(Some(s)))
            .collect();

        Ok(Registration {
            email,
            password,
            full_name: clean_required("Full name", Some(&full_name))?,
            role,
            institution: clean_optional(self.institution),
            country: clean_required("Country", Some(&country))?,
            orcid: clean_optional(self.orcid),
            specialties,
        })
    }
}

/// Creates the account and its welcome notification on `conn`. Callers decide
/// which roles are acceptable and own the surrounding transaction.
pub fn create_account(
    conn: &Connection,
    registration: &Registration,
    hash_cost: u32,
    journal_name: &str,
) -> Result<User, HelperError> {
    if users_db_operations::email_exists(conn, &registration.email)? {
        return Err(HelperError::Validation("Email already registered".to_string()));
    }

    let new_user = NewUser {
        email: &registration.email,
        password: &registration.password,
        full_name: &registration.full_name,
        role: registration.role,
        institution: registration.institution.as_deref(),
        country: &registration.country,
        orcid: registration.orcid.as_deref(),
        specialties: &registration.specialties,
    };

    let user = match users_db_operations::create_user(conn, &new_user, hash_cost) {
        Ok(user) => user,
        // A concurrent registration won the UNIQUE(email) race.
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            return Err(HelperError::Validation("Email already registered".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    notify(
        conn,
        &user.id,
        NotificationKind::Welcome,
        &format!("Welcome to {}", journal_name),
        &format!(
            "Welcome, {}! Your {} account has been created.",
            user.full_name,
            user.role.as_str().to_lowercase()
        ),
        None,
    )?;

    Ok(user)
}

/// Public self-registration. Editorial roles are refused here.
pub fn register(
    pool: &DbPool,
    request: RegisterRequest,
    hash_cost: u32,
    journal_name: &str,
) -> Result<User, HelperError> {
    let registration = request.validate()?;
    if !registration.role.can_self_register() {
        return Err(HelperError::Validation(
            "Only AUTHOR and REVIEWER accounts can be self-registered".to_string(),
        ));
    }

    let mut conn = get_conn(pool)?;
    let tx = begin_write(&mut conn)?;
    let user = create_account(&tx, &registration, hash_cost, journal_name)?;
    tx.commit()?;

    log::info!("Registered {} account for {}", user.role, user.email);
    Ok(user)
}

pub fn login(pool: &DbPool, email: &str, password: &str) -> Result<User, HelperError> {
    let email = email.trim().to_lowercase();
    let conn = get_conn(pool)?;
    users_db_operations::verify_credentials(&conn, &email, password)?.ok_or_else(|| {
        log::warn!("Failed login attempt for {}", email);
        HelperError::InvalidCredentials
    })
}

pub fn current_user(pool: &DbPool, user_id: &str) -> Result<User, HelperError> {
    let conn = get_conn(pool)?;
    users_db_operations::read_user_by_id(&conn, user_id)?.ok_or(HelperError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::test_support::temp_pool;
    use crate::models::db_operations::users_db_operations::count_users;

    fn request(email: &str, password: &str, role: &str) -> RegisterRequest {
        RegisterRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            full_name: Some("Amina Okafor".to_string()),
            role: Some(role.to_string()),
            country: Some("Nigeria".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn password_policy() {
        assert!(validate_password("Short1").is_err());
        assert!(validate_password("alllowercase1").is_err());
        assert!(validate_password("ALLUPPERCASE1").is_err());
        assert!(validate_password("NoDigitsHere").is_err());
        assert!(validate_password("Password123").is_ok());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Amina@Example.ORG ").unwrap(), "amina@example.org");
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("a@b").is_err());
    }

    #[test]
    fn duplicate_email_is_rejected_case_insensitively() {
        let (_dir, pool) = temp_pool();
        register(&pool, request("amina@example.org", "Password123", "AUTHOR"), 4, "GSJP").unwrap();
        let err = register(&pool, request("AMINA@example.org", "Password123", "AUTHOR"), 4, "GSJP").unwrap_err();
        assert!(matches!(err, HelperError::Validation(_)));
        assert_eq!(count_users(&pool.get().unwrap()).unwrap(), 1);
    }

    #[test]
    fn editorial_roles_cannot_self_register() {
        let (_dir, pool) = temp_pool();
        let err = register(&pool, request("ed@example.org", "Password123", "EDITOR"), 4, "GSJP").unwrap_err();
        assert!(matches!(err, HelperError::Validation(_)));
        assert_eq!(count_users(&pool.get().unwrap()).unwrap(), 0);
    }

    #[test]
    fn login_checks_the_password() {
        let (_dir, pool) = temp_pool();
        register(&pool, request("amina@example.org", "Password123", "REVIEWER"), 4, "GSJP").unwrap();
        assert!(login(&pool, "Amina@Example.org", "Password123").is_ok());
        assert!(matches!(
            login(&pool, "amina@example.org", "password123"),
            Err(HelperError::InvalidCredentials)
        ));
    }
}
