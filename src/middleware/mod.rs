use crate::helper::HelperError;
use crate::models::Role;
use actix_session::{Session, SessionExt};
use actix_web::{dev, FromRequest, HttpRequest};
use serde::Serialize;
use std::future::{ready, Ready};

pub const SESSION_USER_ID: &str = "user_id";
pub const SESSION_ROLE: &str = "role";

/// The caller behind the session cookie. Extraction fails with 401 when no
/// valid session is present, so handlers taking it are authenticated-only.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub role: Role,
}

impl AuthenticatedUser {
    /// Fails with 403 unless the caller holds one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), HelperError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            log::warn!("User {} with role {} denied access", self.id, self.role);
            Err(HelperError::Forbidden("Insufficient permissions".to_string()))
        }
    }

    pub fn require_editorial(&self) -> Result<(), HelperError> {
        self.require_role(&[Role::Editor, Role::Admin])
    }

    pub fn is_editorial(&self) -> bool {
        self.role.is_editorial()
    }
}

fn from_session(session: &Session) -> Option<AuthenticatedUser> {
    let id = session.get::<String>(SESSION_USER_ID).ok()??;
    let role = session.get::<String>(SESSION_ROLE).ok()??.parse().ok()?;
    Some(AuthenticatedUser { id, role })
}

impl FromRequest for AuthenticatedUser {
    type Error = HelperError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(from_session(&req.get_session()).ok_or(HelperError::Unauthenticated))
    }
}

/// Starts a fresh session for a user who just proved their credentials.
pub fn begin_session(session: &Session, id: &str, role: Role) -> Result<(), HelperError> {
    session.renew();
    session
        .insert(SESSION_USER_ID, id)
        .and_then(|_| session.insert(SESSION_ROLE, role.as_str()))
        .map_err(|e| HelperError::Session(e.to_string()))
}
