/// Database models for TaskTrail
///
/// # Models
///
/// - `user`: User accounts and roles
/// - `record`: Records (task items) and their audit entries
///
/// Model methods take any `PgExecutor`, so the same query runs against the pool
/// or inside an open transaction.

pub mod record;
pub mod user;
