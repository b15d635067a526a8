/// In-process repository
///
/// Same contract as the Postgres backend: unique normalized emails,
/// insertion-ordered reads and all-or-nothing units of work. A unit of work
/// runs against a staged copy of the state, which replaces the live state only
/// when the work succeeds.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{RecordRepository, RepoError};
use crate::models::{
    record::{AuditEntry, AuditOperation, Record},
    user::{normalize_email, Role, User},
};

/// Tables held by [`MemoryRecordRepository`]
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    users: Vec<User>,
    records: Vec<Record>,
    audit_entries: Vec<AuditEntry>,
    last_user_id: i64,
    last_record_id: i64,
    last_audit_id: i64,

    /// Record names whose audit insert fails
    failing_audit_names: Vec<String>,
}

impl MemoryState {
    /// Inserts a record for `owner_id`
    pub fn insert_record(&mut self, owner_id: i64, name: &str) -> Result<Record, RepoError> {
        self.last_record_id += 1;
        let record = Record {
            id: self.last_record_id,
            name: name.to_string(),
            owner_id,
        };
        self.records.push(record.clone());
        Ok(record)
    }

    /// Inserts an audit entry
    ///
    /// Fails like the `audit_entries.record_id` foreign key when the record
    /// does not exist.
    pub fn insert_audit_entry(
        &mut self,
        record_id: i64,
        operation: AuditOperation,
    ) -> Result<AuditEntry, RepoError> {
        let record = self
            .records
            .iter()
            .find(|r| r.id == record_id)
            .ok_or(RepoError::Database(sqlx::Error::RowNotFound))?;

        if self.failing_audit_names.contains(&record.name) {
            return Err(RepoError::Database(sqlx::Error::Protocol(format!(
                "audit insert failed for record {}",
                record_id
            ))));
        }

        self.last_audit_id += 1;
        let entry = AuditEntry {
            id: self.last_audit_id,
            record_id,
            operation,
            created_at: Utc::now(),
        };
        self.audit_entries.push(entry.clone());
        Ok(entry)
    }

    fn insert_user(&mut self, email: String, password_hash: &str) -> Result<User, RepoError> {
        if self.users.iter().any(|u| u.email == email) {
            return Err(RepoError::UniqueViolation {
                constraint: Some("users_email_key".to_string()),
            });
        }

        self.last_user_id += 1;
        let user = User {
            id: self.last_user_id,
            email,
            password_hash: password_hash.to_string(),
            role: Role::default(),
            created_at: Utc::now(),
        };
        self.users.push(user.clone());
        Ok(user)
    }
}

#[derive(Debug, Default)]
pub struct MemoryRecordRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` against a staged copy of the state
    ///
    /// The copy replaces the live state only if `work` returns `Ok`. The lock
    /// is held for the whole unit of work, so units never interleave.
    pub async fn in_transaction<T, F>(&self, work: F) -> Result<T, RepoError>
    where
        F: FnOnce(&mut MemoryState) -> Result<T, RepoError>,
    {
        let mut state = self.state.lock().await;
        let mut staged = state.clone();

        let value = work(&mut staged)?;

        *state = staged;
        Ok(value)
    }

    /// Makes every audit insert for a record named `name` fail
    ///
    /// Lets tests break `create_with_audit` between its two writes.
    pub async fn fail_audit_writes_for(&self, name: &str) {
        self.state
            .lock()
            .await
            .failing_audit_names
            .push(name.to_string());
    }

    /// Snapshot of every audit entry
    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.lock().await.audit_entries.clone()
    }

    /// Changes a user's role
    ///
    /// Seeding helper for accounts that the API never promotes itself.
    pub async fn set_role(&self, user_id: i64, role: Role) -> Result<User, RepoError> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(RepoError::UserNotFound)?;

        user.role = role;
        Ok(user.clone())
    }
}

#[async_trait]
impl RecordRepository for MemoryRecordRepository {
    async fn find_all_by_owner(&self, owner_id: i64) -> Result<Vec<Record>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn create_with_audit(&self, owner_id: i64, name: &str) -> Result<Record, RepoError> {
        self.in_transaction(|state| {
            let record = state.insert_record(owner_id, name)?;
            state.insert_audit_entry(record.id, AuditOperation::Create)?;
            Ok(record)
        })
        .await
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, RepoError> {
        let email = normalize_email(email);
        self.in_transaction(|state| state.insert_user(email, password_hash))
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User, RepoError> {
        let email = normalize_email(email);
        let state = self.state.lock().await;
        state
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(RepoError::UserNotFound)
    }

    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        Ok(self.state.lock().await.users.clone())
    }

    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}
