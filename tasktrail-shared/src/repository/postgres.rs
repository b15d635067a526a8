/// Postgres-backed repository
///
/// Multi-statement writes go through [`PgRecordRepository::in_transaction`]:
/// the closure receives the open connection, and the transaction is committed
/// only if it returns `Ok`.

use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, warn};

use super::{RecordRepository, RepoError};
use crate::db::pool::health_check;
use crate::models::{
    record::{AuditEntry, AuditOperation, Record},
    user::{normalize_email, User},
};

#[derive(Debug, Clone)]
pub struct PgRecordRepository {
    pool: PgPool,
}

impl PgRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs `work` inside one transaction
    ///
    /// Commits when `work` returns `Ok`. On `Err` the transaction is rolled
    /// back and the error from `work` is returned unchanged; a failed rollback
    /// is only logged (the connection is discarded by the pool either way).
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tasktrail_shared::repository::{PgRecordRepository, RepoError};
    /// # use tasktrail_shared::models::record::Record;
    /// # async fn example(repo: PgRecordRepository) -> Result<(), RepoError> {
    /// let records = repo
    ///     .in_transaction(|conn| {
    ///         Box::pin(async move {
    ///             let first = Record::insert(&mut *conn, 1, "first").await?;
    ///             let second = Record::insert(&mut *conn, 1, "second").await?;
    ///             Ok(vec![first, second])
    ///         })
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn in_transaction<T, F>(&self, work: F) -> Result<T, RepoError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, RepoError>> + Send,
    {
        let mut tx = self.pool.begin().await?;

        match work(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        error = %err,
                        rollback_error = %rollback_err,
                        "Transaction rollback failed"
                    );
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl RecordRepository for PgRecordRepository {
    async fn find_all_by_owner(&self, owner_id: i64) -> Result<Vec<Record>, RepoError> {
        Ok(Record::list_by_owner(&self.pool, owner_id).await?)
    }

    async fn create_with_audit(&self, owner_id: i64, name: &str) -> Result<Record, RepoError> {
        let name = name.to_string();

        let record = self
            .in_transaction(move |conn| {
                Box::pin(async move {
                    let record = Record::insert(&mut *conn, owner_id, &name).await?;
                    AuditEntry::insert(&mut *conn, record.id, AuditOperation::Create).await?;
                    Ok(record)
                })
            })
            .await?;

        debug!(record_id = record.id, owner_id, "Record created with audit entry");
        Ok(record)
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, RepoError> {
        let email = normalize_email(email);
        Ok(User::insert(&self.pool, &email, password_hash).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User, RepoError> {
        let email = normalize_email(email);
        User::find_by_email(&self.pool, &email)
            .await?
            .ok_or(RepoError::UserNotFound)
    }

    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        Ok(User::list(&self.pool).await?)
    }

    async fn ping(&self) -> Result<(), RepoError> {
        Ok(health_check(&self.pool).await?)
    }
}
