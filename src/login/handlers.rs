use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::{
    AppState,
    session::{Flash, Session, flash_cookie, flash_redirect, redirect_with_cookies},
    templating::Page,
};

use super::{
    AdminSession, ChangePasswordForm, LOGIN_PATH, LoginError, LoginForm, PasswordChangeProblem,
    set_admin_password, verify_admin_password,
};

pub const DASHBOARD_PATH: &str = "/admin/";
const CHANGE_PASSWORD_PATH: &str = "/admin/change-password";

pub async fn login_page(
    State(app_state): State<AppState>,
    Session(session): Session,
    headers: HeaderMap,
) -> Response {
    if session.admin {
        return Redirect::to(DASHBOARD_PATH).into_response();
    }

    Page::new("admin/login.html.liquid", "Admin Login", liquid::object!({}))
        .render(&app_state, &headers)
        .await
}

pub async fn login_submit(
    State(app_state): State<AppState>,
    Session(mut session): Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, LoginError> {
    let secret = &app_state.config.app.session_secret;

    if !verify_admin_password(app_state.gallery.database(), form.password).await? {
        warn!("Admin login failed - invalid password");
        return Ok(flash_redirect(
            secret,
            LOGIN_PATH,
            &[Flash::danger("Incorrect password")],
        ));
    }

    session.admin = true;
    session.issued_at = Utc::now().timestamp();

    let session_cookie = session
        .to_cookie(secret, app_state.config.app.session_ttl_hours)
        .map_err(|e| LoginError::InternalError(e.to_string()))?;
    let flash = flash_cookie(secret, &[Flash::success("Logged in successfully")])
        .map_err(|e| LoginError::InternalError(e.to_string()))?;

    info!("Admin logged in");
    Ok(redirect_with_cookies(DASHBOARD_PATH, vec![session_cookie, flash]))
}

pub async fn logout(State(app_state): State<AppState>, Session(mut session): Session) -> Response {
    let app = &app_state.config.app;
    session.admin = false;

    let mut cookies = Vec::new();
    match session.to_cookie(&app.session_secret, app.session_ttl_hours) {
        Ok(cookie) => cookies.push(cookie),
        Err(e) => error!("Failed to write session on logout: {}", e),
    }
    match flash_cookie(&app.session_secret, &[Flash::success("You have been logged out")]) {
        Ok(cookie) => cookies.push(cookie),
        Err(e) => error!("Failed to write flash on logout: {}", e),
    }

    info!("Admin logged out");
    redirect_with_cookies("/", cookies)
}

pub async fn change_password_page(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    Page::new(
        "admin/change_password.html.liquid",
        "Change Password",
        liquid::object!({ "min_length": super::MIN_PASSWORD_LENGTH }),
    )
    .render(&app_state, &headers)
    .await
}

pub async fn change_password_submit(
    _admin: AdminSession,
    State(app_state): State<AppState>,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Response, LoginError> {
    let secret = &app_state.config.app.session_secret;
    let db = app_state.gallery.database();

    let refuse = |problem: PasswordChangeProblem| {
        warn!("Password change refused: {:?}", problem);
        flash_redirect(secret, CHANGE_PASSWORD_PATH, &[Flash::danger(problem.message())])
    };

    if !verify_admin_password(db, form.old_password.clone()).await? {
        return Ok(refuse(PasswordChangeProblem::WrongOldPassword));
    }
    if let Err(problem) = form.validate_new_password() {
        return Ok(refuse(problem));
    }

    set_admin_password(db, form.new_password, app_state.config.app.password_hash_cost).await?;

    Ok(flash_redirect(
        secret,
        DASHBOARD_PATH,
        &[Flash::success("Password changed. Keep the new password somewhere safe.")],
    ))
}
