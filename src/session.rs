//! Request identity and one-shot flash messages.
//!
//! Identity lives in an actix-session cookie session signed with the
//! application key. The session stores the user id, username and the login
//! time; sessions older than the configured lifetime are purged on first use.
//! A missing, malformed, tampered or expired session makes the request
//! anonymous. Flash messages go through actix-web-flash-messages.

use std::future::{ready, Ready};

use actix_session::config::{CookieContentSecurity, PersistentSession, TtlExtensionPolicy};
use actix_session::storage::CookieSessionStore;
use actix_session::{Session, SessionExt, SessionMiddleware};
use actix_web::cookie::{time, Key, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use actix_web_flash_messages::storage::CookieMessageStore;
use actix_web_flash_messages::{FlashMessage, FlashMessagesFramework, Level};
use chrono::Utc;
use uuid::Uuid;

use crate::domain::account::AuthContext;
use crate::errors::AppError;

pub const SESSION_COOKIE: &str = "storefront_session";

const USER_ID_KEY: &str = "user_id";
const USERNAME_KEY: &str = "username";
const LOGGED_IN_AT_KEY: &str = "logged_in_at";

/// Signing key and session policy shared by every worker.
#[derive(Clone)]
pub struct SessionSettings {
    key: Key,
    secure: bool,
    ttl_secs: i64,
}

impl SessionSettings {
    /// Builds the signing key from a configured secret, or a random one when
    /// none is configured (sessions then die with the process).
    pub fn new(secret: Option<&[u8]>, secure: bool, ttl_secs: i64) -> Result<Self, AppError> {
        let key = match secret {
            Some(bytes) => Key::try_from(bytes)
                .map_err(|e| AppError::Internal(format!("invalid session secret: {e}")))?,
            None => {
                log::warn!("SESSION_SECRET not set, sessions will not survive a restart");
                Key::generate()
            }
        };
        Ok(Self {
            key,
            secure,
            ttl_secs,
        })
    }

    pub fn session_middleware(&self) -> SessionMiddleware<CookieSessionStore> {
        SessionMiddleware::builder(CookieSessionStore::default(), self.key.clone())
            .cookie_name(SESSION_COOKIE.to_string())
            .cookie_secure(self.secure)
            .cookie_http_only(true)
            .cookie_same_site(SameSite::Lax)
            .cookie_content_security(CookieContentSecurity::Signed)
            .session_lifecycle(
                PersistentSession::default()
                    .session_ttl(time::Duration::seconds(self.ttl_secs))
                    .session_ttl_extension_policy(TtlExtensionPolicy::OnStateChanges),
            )
            .build()
    }

    pub fn flash_framework(&self) -> FlashMessagesFramework {
        let store = CookieMessageStore::builder(self.key.clone()).build();
        FlashMessagesFramework::builder(store)
            .minimum_level(Level::Info)
            .build()
    }

    /// Starts a fresh session for `ctx`.
    pub fn log_in(&self, session: &Session, ctx: &AuthContext) -> Result<(), AppError> {
        session.renew();
        let stored = session
            .insert(USER_ID_KEY, ctx.user_id)
            .and_then(|_| session.insert(USERNAME_KEY, &ctx.username))
            .and_then(|_| session.insert(LOGGED_IN_AT_KEY, Utc::now().timestamp()));
        stored.map_err(|e| AppError::Internal(format!("session: {e}")))
    }

    /// Identity carried by the session, if it is complete and not expired.
    pub fn identify(&self, session: &Session) -> Option<AuthContext> {
        self.identify_at(session, Utc::now().timestamp())
    }

    fn identify_at(&self, session: &Session, now: i64) -> Option<AuthContext> {
        let logged_in_at = session.get::<i64>(LOGGED_IN_AT_KEY).ok()??;
        if now.saturating_sub(logged_in_at) >= self.ttl_secs {
            log::debug!("session from {logged_in_at} expired");
            session.purge();
            return None;
        }
        let user_id = session.get::<Uuid>(USER_ID_KEY).ok()??;
        let username = session.get::<String>(USERNAME_KEY).ok()??;
        if username.is_empty() {
            return None;
        }
        Some(AuthContext { user_id, username })
    }
}

/// Ends the session; the browser is told to drop the cookie.
pub fn log_out(session: &Session) {
    session.purge();
}

fn settings(req: &HttpRequest) -> Result<&SessionSettings, AppError> {
    req.app_data::<web::Data<SessionSettings>>()
        .map(|data| data.get_ref())
        .ok_or_else(|| AppError::Internal("session settings are not configured".to_string()))
}

/// Requires a logged-in user; anonymous requests are sent to the login page.
impl FromRequest for AuthContext {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let identified = settings(req).map(|settings| settings.identify(&req.get_session()));
        ready(match identified {
            Ok(Some(ctx)) => Ok(ctx),
            Ok(None) => {
                Flash::NotLoggedIn.send();
                Err(AppError::Unauthorized)
            }
            Err(e) => Err(e),
        })
    }
}

/// The current user, if any. Never rejects a request.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<AuthContext>);

impl Viewer {
    pub fn ctx(&self) -> Option<&AuthContext> {
        self.0.as_ref()
    }
}

impl FromRequest for Viewer {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(settings(req).map(|settings| Viewer(settings.identify(&req.get_session()))))
    }
}

// ── Flash messages ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    LoggedIn,
    LoggedOut,
    LoginFailed,
    Registered,
    RegistrationFailed,
    NotLoggedIn,
    ReviewRejected,
    ShippingInvalid,
    EmptyCart,
    Paid,
}

impl Flash {
    pub fn message(self) -> &'static str {
        match self {
            Flash::LoggedIn => "You are now logged in!",
            Flash::LoggedOut => "You are now logged out!",
            Flash::LoginFailed | Flash::RegistrationFailed => "Please correct the error below.",
            Flash::Registered => "You have successfully registered!",
            Flash::NotLoggedIn => "You are not logged in!",
            Flash::ReviewRejected => "A review must be between 1 and 5000 characters.",
            Flash::ShippingInvalid => "Please check your shipping details.",
            Flash::EmptyCart => "Your cart is empty.",
            Flash::Paid => "You have successfully paid",
        }
    }

    pub fn level(self) -> Level {
        match self {
            Flash::LoggedIn | Flash::Registered | Flash::Paid => Level::Success,
            Flash::LoggedOut => Level::Warning,
            _ => Level::Error,
        }
    }

    /// Queues the message for the next rendered page.
    pub fn send(self) {
        FlashMessage::new(self.message().to_string(), self.level()).send();
    }
}

/// CSS class of a flash level, as used by the templates.
pub fn level_class(level: Level) -> &'static str {
    match level {
        Level::Success => "success",
        Level::Warning => "warning",
        Level::Error => "danger",
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    const TTL: i64 = 3600;

    fn settings() -> SessionSettings {
        SessionSettings::new(Some(&[7u8; 64][..]), false, TTL).unwrap()
    }

    fn ctx() -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            username: "aziz".to_string(),
        }
    }

    #[test]
    fn logged_in_session_identifies_the_user() {
        let settings = settings();
        let session = TestRequest::default().to_http_request().get_session();
        let ctx = ctx();

        settings.log_in(&session, &ctx).unwrap();

        assert_eq!(settings.identify(&session), Some(ctx));
    }

    #[test]
    fn empty_session_is_anonymous() {
        let session = TestRequest::default().to_http_request().get_session();
        assert_eq!(settings().identify(&session), None);
    }

    #[test]
    fn session_expires_after_its_lifetime() {
        let settings = settings();
        let session = TestRequest::default().to_http_request().get_session();
        settings.log_in(&session, &ctx()).unwrap();
        let now = Utc::now().timestamp();

        assert!(settings.identify_at(&session, now + TTL - 60).is_some());
        assert_eq!(settings.identify_at(&session, now + TTL), None);
        // Expiry purges the session, so it stays anonymous afterwards.
        assert_eq!(settings.identify_at(&session, now), None);
    }

    #[test]
    fn logout_forgets_the_user() {
        let settings = settings();
        let session = TestRequest::default().to_http_request().get_session();
        settings.log_in(&session, &ctx()).unwrap();

        log_out(&session);

        assert_eq!(settings.identify(&session), None);
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(SessionSettings::new(Some(&b"short"[..]), false, TTL).is_err());
    }

    #[test]
    fn flash_levels_map_to_css_classes() {
        assert_eq!(level_class(Flash::Paid.level()), "success");
        assert_eq!(level_class(Flash::LoggedOut.level()), "warning");
        assert_eq!(level_class(Flash::NotLoggedIn.level()), "danger");
        assert_eq!(Flash::NotLoggedIn.message(), "You are not logged in!");
    }
}
