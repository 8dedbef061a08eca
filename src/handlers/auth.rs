use actix_session::Session;
use actix_web::{web, HttpResponse};
use actix_web_flash_messages::IncomingFlashMessages;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::account::Registration;
use crate::domain::errors::DomainError;
use crate::errors::{AppError, LOGIN_PATH};
use crate::session::{log_out, Flash, SessionSettings, Viewer};
use crate::views::{Chrome, LoginRegisterPage};
use crate::Services;

use super::{redirect_with, render};

// ── Request DTOs ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegistrationForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

impl From<RegistrationForm> for Registration {
    fn from(form: RegistrationForm) -> Self {
        Registration {
            username: form.username,
            first_name: form.first_name,
            last_name: form.last_name,
            email: form.email,
            password1: form.password1,
            password2: form.password2,
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /login_registration
#[utoipa::path(
    get,
    path = "/login_registration",
    responses(
        (status = 200, description = "Login and registration forms", content_type = "text/html"),
    ),
    tag = "accounts"
)]
pub async fn login_registration(
    viewer: Viewer,
    flash: IncomingFlashMessages,
) -> Result<HttpResponse, AppError> {
    let page = LoginRegisterPage {
        chrome: Chrome::new("Login and Registration", viewer.ctx(), &flash),
    };
    render(&page)
}

/// POST /login
///
/// On success a fresh session is started and the user lands on the home page;
/// otherwise they are sent back to the login page.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Logged in, redirected home; or back to the login page"),
    ),
    tag = "accounts"
)]
pub async fn login(
    services: web::Data<Services>,
    sessions: web::Data<SessionSettings>,
    session: Session,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    let LoginForm { username, password } = form.into_inner();
    let accounts = services.accounts.clone();

    match web::block(move || accounts.login(username.trim(), &password)).await? {
        Ok(ctx) => {
            log::info!("{} logged in", ctx.username);
            sessions.log_in(&session, &ctx)?;
            Ok(redirect_with("/", Flash::LoggedIn))
        }
        Err(DomainError::InvalidCredentials) => Ok(redirect_with(LOGIN_PATH, Flash::LoginFailed)),
        Err(e) => Err(e.into()),
    }
}

/// POST /register
///
/// Creates the account without logging the user in.
#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegistrationForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Registered, redirected home; or back to the login page"),
    ),
    tag = "accounts"
)]
pub async fn register(
    services: web::Data<Services>,
    form: web::Form<RegistrationForm>,
) -> Result<HttpResponse, AppError> {
    let registration = Registration::from(form.into_inner());
    let accounts = services.accounts.clone();

    match web::block(move || accounts.register(registration)).await? {
        Ok(_) => Ok(redirect_with("/", Flash::Registered)),
        Err(DomainError::InvalidInput(reason)) | Err(DomainError::Conflict(reason)) => {
            log::debug!("registration rejected: {reason}");
            Ok(redirect_with(LOGIN_PATH, Flash::RegistrationFailed))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /logout
#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 302, description = "Session purged, redirected to the login page"),
    ),
    tag = "accounts"
)]
pub async fn logout(session: Session) -> HttpResponse {
    log_out(&session);
    redirect_with(LOGIN_PATH, Flash::LoggedOut)
}
