use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::domain::account::{AuthContext, NewUser, Registration, User};
use crate::domain::errors::DomainError;
use crate::domain::ports::AccountRepository;

#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
}

impl AccountService {
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }

    /// Creates an account. Does not sign the new user in.
    pub fn register(&self, form: Registration) -> Result<User, DomainError> {
        form.validate()?;
        let password_hash = hash_password(&form.password1)?;
        let user = self.accounts.create_user(NewUser {
            username: form.username,
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            email: form.email.trim().to_string(),
            password_hash,
        })?;
        log::info!("registered user {}", user.username);
        Ok(user)
    }

    /// Checks credentials. Unknown users and wrong passwords both yield
    /// `InvalidCredentials`.
    pub fn login(&self, username: &str, password: &str) -> Result<AuthContext, DomainError> {
        let Some(user) = self.accounts.find_by_username(username)? else {
            log::warn!("login attempt for unknown user {username:?}");
            return Err(DomainError::InvalidCredentials);
        };
        if let Err(e) = verify_password(password, &user.password_hash) {
            log::warn!("failed login for {}", user.username);
            return Err(e);
        }
        Ok(AuthContext {
            user_id: user.id,
            username: user.username,
        })
    }
}

fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<(), DomainError> {
    let parsed = PasswordHash::new(hash).map_err(|_| DomainError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| DomainError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::InMemoryStore;

    fn service() -> (Arc<InMemoryStore>, AccountService) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), AccountService::new(store))
    }

    fn form(username: &str) -> Registration {
        Registration {
            username: username.to_string(),
            first_name: "Aziz".to_string(),
            last_name: "Karimov".to_string(),
            email: "aziz@example.com".to_string(),
            password1: "s3cret-pass".to_string(),
            password2: "s3cret-pass".to_string(),
        }
    }

    #[test]
    fn registered_user_can_log_in() {
        let (_, accounts) = service();
        let user = accounts.register(form("aziz")).expect("register");

        let ctx = accounts.login("aziz", "s3cret-pass").expect("login");

        assert_eq!(ctx.user_id, user.id);
        assert_eq!(ctx.username, "aziz");
    }

    #[test]
    fn password_is_stored_hashed() {
        let (store, accounts) = service();
        accounts.register(form("aziz")).expect("register");

        let stored = store.find_by_username("aziz").unwrap().expect("stored");

        assert_ne!(stored.password_hash, "s3cret-pass");
        assert!(stored.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let (_, accounts) = service();
        accounts.register(form("aziz")).expect("register");

        let result = accounts.login("aziz", "not-the-password");

        assert!(matches!(result, Err(DomainError::InvalidCredentials)));
    }

    #[test]
    fn unknown_user_is_rejected_like_a_wrong_password() {
        let (_, accounts) = service();
        let result = accounts.login("ghost", "whatever1");
        assert!(matches!(result, Err(DomainError::InvalidCredentials)));
    }

    #[test]
    fn duplicate_username_conflicts() {
        let (_, accounts) = service();
        accounts.register(form("aziz")).expect("register");

        let result = accounts.register(form("aziz"));

        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[test]
    fn invalid_form_is_not_stored() {
        let (store, accounts) = service();
        let mut bad = form("aziz");
        bad.password2 = "different-pass".to_string();

        assert!(accounts.register(bad).is_err());
        assert!(store.find_by_username("aziz").unwrap().is_none());
    }
}
