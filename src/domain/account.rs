use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_USERNAME_LENGTH: usize = 150;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

/// The authenticated identity of the current request.
///
/// Built from the session cookie for every request and passed explicitly into
/// the services that act on behalf of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub username: String,
}

/// Sign-up form as submitted.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_username(&self.username)?;
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "first and last name are required".to_string(),
            ));
        }
        let email = self.email.trim();
        if email.len() < 3 || !email.contains('@') {
            return Err(DomainError::InvalidInput("invalid email".to_string()));
        }
        if self.password1 != self.password2 {
            return Err(DomainError::InvalidInput(
                "passwords do not match".to_string(),
            ));
        }
        if self.password1.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::InvalidInput(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

/// Usernames allow letters, digits and `@.+-_`.
pub fn validate_username(username: &str) -> Result<(), DomainError> {
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(DomainError::InvalidInput(format!(
            "username must be 1 to {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(DomainError::InvalidInput(
            "username may only contain letters, digits and @/./+/-/_".to_string(),
        ));
    }
    Ok(())
}
