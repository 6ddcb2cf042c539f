//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.
//!
//! Email uniqueness is enforced by the database index; a violation surfaces
//! as [`UserRepositoryError::DuplicateEmail`] so concurrent registrations of
//! the same address cannot both succeed.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{UserRepository, UserRepositoryError};
use crate::domain::{Email, NewUser, PasswordHash, User, UserId, Username};

use super::diesel_basic_error_mapping::{
    is_unique_violation, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{NewUserRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the user repository port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserRepositoryError {
    map_basic_pool_error(error, UserRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> UserRepositoryError {
    map_basic_diesel_error(
        error,
        UserRepositoryError::query,
        UserRepositoryError::connection,
    )
}

/// Convert a database row into a validated domain user.
fn row_to_user(row: UserRow) -> Result<User, UserRepositoryError> {
    let UserRow {
        id,
        username,
        email,
        password_hash,
    } = row;
    let id = UserId::new(id).map_err(|err| UserRepositoryError::query(err.to_string()))?;
    let username =
        Username::new(username).map_err(|err| UserRepositoryError::query(err.to_string()))?;
    let email = Email::new(email).map_err(|err| UserRepositoryError::query(err.to_string()))?;
    Ok(User::new(id, username, email, PasswordHash::new(password_hash)))
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = NewUserRow {
            username: user.username.as_str(),
            email: user.email.as_str(),
            password_hash: user.password_hash.as_str(),
        };

        let inserted: UserRow = diesel::insert_into(users::table)
            .values(&row)
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    UserRepositoryError::duplicate_email(user.email.as_str())
                } else {
                    map_diesel_error(err)
                }
            })?;

        row_to_user(inserted)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .filter(users::id.eq(id.get()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .filter(users::email.eq(email.as_str()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_user).transpose()
    }
}

#[cfg(test)]
mod tests {
    //! Row conversion coverage; database behaviour is exercised end to end.
    use super::*;
    use rstest::rstest;

    fn row(id: i32, email: &str) -> UserRow {
        UserRow {
            id,
            username: "ada".to_owned(),
            email: email.to_owned(),
            password_hash: "$2b$04$hash".to_owned(),
        }
    }

    #[rstest]
    fn row_to_user_builds_domain_user() {
        let user = row_to_user(row(7, "ada@example.com")).expect("valid row");
        assert_eq!(user.id().get(), 7);
        assert_eq!(user.email().as_str(), "ada@example.com");
        assert_eq!(user.password_hash().as_str(), "$2b$04$hash");
    }

    #[rstest]
    #[case(0, "ada@example.com")]
    #[case(1, "not-an-email")]
    fn row_to_user_rejects_corrupt_rows(#[case] id: i32, #[case] email: &str) {
        let err = row_to_user(row(id, email)).expect_err("corrupt row");
        assert!(matches!(err, UserRepositoryError::Query { .. }));
    }

    #[rstest]
    fn pool_failures_map_to_connection_errors() {
        let err = map_pool_error(PoolError::checkout("timed out"));
        assert!(matches!(err, UserRepositoryError::Connection { .. }));
    }
}
