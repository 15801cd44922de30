use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::Response,
};
use tracing::{debug, info};

use super::LoginError;
use crate::{
    AppState,
    db::Database,
    session::{Flash, SessionData, flash_redirect},
};

pub const LOGIN_PATH: &str = "/admin/login";

/// Hash a password with bcrypt at the given cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, LoginError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Store the initial admin password unless a credential already exists.
/// Returns true when a credential was created.
pub fn seed_admin_password(db: &Database, password: &str, cost: u32) -> Result<bool, LoginError> {
    if db.admin_password_hash()?.is_some() {
        return Ok(false);
    }

    db.set_admin_password_hash(&hash_password(password, cost)?)?;
    info!("Seeded admin credential from configuration");
    Ok(true)
}

/// Check `password` against the stored credential. bcrypt runs on the
/// blocking pool.
pub async fn verify_admin_password(db: &Database, password: String) -> Result<bool, LoginError> {
    let hash = db
        .admin_password_hash()?
        .ok_or(LoginError::CredentialMissing)?;

    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(matches)
}

pub async fn set_admin_password(db: &Database, password: String, cost: u32) -> Result<(), LoginError> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password, cost)).await??;
    db.set_admin_password_hash(&hash)?;
    info!("Admin password updated");
    Ok(())
}

/// Check if the request carries an authenticated admin session
pub fn is_authenticated(parts: &Parts, state: &AppState) -> Option<SessionData> {
    let app = &state.config.app;
    SessionData::from_headers(&parts.headers, &app.session_secret, app.session_ttl_hours)
        .filter(|session| session.admin)
}

/// Extractor for admin-only handlers. Anonymous visitors are redirected to
/// the login page with a flash message.
#[derive(Debug, Clone)]
pub struct AdminSession(pub SessionData);

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match is_authenticated(parts, state) {
            Some(session) => Ok(AdminSession(session)),
            None => {
                debug!("Anonymous request to {} redirected to login", parts.uri.path());
                Err(flash_redirect(
                    &state.config.app.session_secret,
                    LOGIN_PATH,
                    &[Flash::danger("Please log in first")],
                ))
            }
        }
    }
}
