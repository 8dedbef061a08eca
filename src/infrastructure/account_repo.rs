use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::account::{NewUser, User};
use crate::domain::errors::DomainError;
use crate::domain::ports::AccountRepository;
use crate::schema::users;

use super::insert_error;
use super::models::{NewUserRow, UserRow};

pub struct DieselAccountRepository {
    pool: DbPool,
}

impl DieselAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AccountRepository for DieselAccountRepository {
    fn create_user(&self, user: NewUser) -> Result<User, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(users::table)
            .values(&NewUserRow {
                id: Uuid::new_v4(),
                username: &user.username,
                first_name: &user.first_name,
                last_name: &user.last_name,
                email: &user.email,
                password_hash: &user.password_hash,
            })
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| {
                insert_error(
                    e,
                    || format!("username '{}' is taken", user.username),
                    "User",
                )
            })?;
        Ok(row.into())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = users::table
            .filter(users::username.eq(username))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::DieselAccountRepository;
    use crate::domain::account::NewUser;
    use crate::domain::errors::DomainError;
    use crate::domain::ports::AccountRepository;
    use crate::infrastructure::test_support::setup_db;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            first_name: "Aziz".to_string(),
            last_name: "Karimov".to_string(),
            email: "aziz@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_find_by_username_roundtrip() {
        let (_container, pool) = setup_db().await;
        let repo = DieselAccountRepository::new(pool);

        let created = repo.create_user(new_user("aziz")).expect("create failed");
        let found = repo
            .find_by_username("aziz")
            .expect("find failed")
            .expect("user should exist");

        assert_eq!(found, created);
        assert!(repo.find_by_username("ghost").expect("find").is_none());
    }

    #[tokio::test]
    async fn taken_username_conflicts() {
        let (_container, pool) = setup_db().await;
        let repo = DieselAccountRepository::new(pool);
        repo.create_user(new_user("aziz")).expect("create failed");

        let result = repo.create_user(new_user("aziz"));

        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }
}
