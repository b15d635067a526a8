/// Record (task item) and audit entry models
///
/// # Schema
///
/// ```sql
/// CREATE TYPE audit_operation AS ENUM ('create');
///
/// CREATE TABLE records (
///     id BIGSERIAL PRIMARY KEY,
///     name TEXT NOT NULL CHECK (name <> ''),
///     owner_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE
/// );
///
/// CREATE TABLE audit_entries (
///     id BIGSERIAL PRIMARY KEY,
///     record_id BIGINT NOT NULL REFERENCES records(id) ON DELETE CASCADE,
///     operation audit_operation NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// The inserts here are building blocks for
/// [`RecordRepository::create_with_audit`](crate::repository::RecordRepository::create_with_audit),
/// which runs both inside one transaction. Do not call them against a bare pool
/// for writes that need an audit entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

/// A task item owned by exactly one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Record {
    /// Unique record ID
    pub id: i64,

    /// Non-empty display name
    pub name: String,

    /// Owning user, always taken from the authenticated identity
    pub owner_id: i64,
}

/// Operation tag written to the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_operation", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuditOperation {
    Create,
}

/// Audit log row written alongside a record mutation
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub record_id: i64,
    pub operation: AuditOperation,
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// Inserts a record bound to `owner_id`
    pub async fn insert<'e, E>(executor: E, owner_id: i64, name: &str) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Record>(
            r#"
            INSERT INTO records (name, owner_id)
            VALUES ($1, $2)
            RETURNING id, name, owner_id
            "#,
        )
        .bind(name)
        .bind(owner_id)
        .fetch_one(executor)
        .await
    }

    /// Lists an owner's records in insertion order
    pub async fn list_by_owner<'e, E>(executor: E, owner_id: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Record>(
            r#"
            SELECT id, name, owner_id
            FROM records
            WHERE owner_id = $1
            ORDER BY id
            "#,
        )
        .bind(owner_id)
        .fetch_all(executor)
        .await
    }
}

impl AuditEntry {
    /// Inserts one audit entry for `record_id`
    pub async fn insert<'e, E>(
        executor: E,
        record_id: i64,
        operation: AuditOperation,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AuditEntry>(
            r#"
            INSERT INTO audit_entries (record_id, operation)
            VALUES ($1, $2)
            RETURNING id, record_id, operation, created_at
            "#,
        )
        .bind(record_id)
        .bind(operation)
        .fetch_one(executor)
        .await
    }

    /// Lists the audit trail of one record
    pub async fn list_by_record<'e, E>(executor: E, record_id: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, record_id, operation, created_at
            FROM audit_entries
            WHERE record_id = $1
            ORDER BY id
            "#,
        )
        .bind(record_id)
        .fetch_all(executor)
        .await
    }
}
