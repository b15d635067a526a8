/// Persistence boundary
///
/// [`RecordRepository`] is the only component that writes records and audit
/// entries, and it owns the transaction around them. Handlers hold it as
/// `Arc<dyn RecordRepository>`, so the Postgres backend and the in-memory
/// backend are interchangeable.
///
/// # Example
///
/// ```
/// use tasktrail_shared::repository::{MemoryRecordRepository, RecordRepository};
///
/// # async fn example() -> Result<(), tasktrail_shared::repository::RepoError> {
/// let repo = MemoryRecordRepository::new();
/// let user = repo.create_user("Alice@Example.com", "$argon2id$...").await?;
///
/// let record = repo.create_with_audit(user.id, "write report").await?;
/// assert_eq!(repo.find_all_by_owner(user.id).await?, vec![record]);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryRecordRepository;
pub use postgres::PgRecordRepository;

use async_trait::async_trait;

use crate::models::{record::Record, user::User};

/// Repository errors
///
/// Database failures keep the underlying `sqlx::Error` as their source.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// No user with the given email
    #[error("user not found")]
    UserNotFound,

    /// Insert collided with a unique constraint
    #[error("unique constraint violated ({})", .constraint.as_deref().unwrap_or("unnamed"))]
    UniqueViolation { constraint: Option<String> },

    #[error("database error")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepoError::UniqueViolation {
                    constraint: db_err.constraint().map(str::to_string),
                }
            }
            _ => RepoError::Database(err),
        }
    }
}

/// Storage operations used by the API
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Returns the owner's records in insertion order (empty if none)
    async fn find_all_by_owner(&self, owner_id: i64) -> Result<Vec<Record>, RepoError>;

    /// Creates a record and its `create` audit entry atomically
    ///
    /// Either both rows exist after the call or neither does. Errors are
    /// returned as they occurred, after rollback.
    async fn create_with_audit(&self, owner_id: i64, name: &str) -> Result<Record, RepoError>;

    /// Creates a user with the default role
    ///
    /// # Errors
    ///
    /// [`RepoError::UniqueViolation`] if the normalized email is taken
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, RepoError>;

    /// Looks up a user for login
    ///
    /// # Errors
    ///
    /// [`RepoError::UserNotFound`] if no user has this email
    async fn find_user_by_email(&self, email: &str) -> Result<User, RepoError>;

    /// All users in creation order
    async fn list_users(&self) -> Result<Vec<User>, RepoError>;

    /// Checks that the backing store is reachable
    async fn ping(&self) -> Result<(), RepoError>;
}
