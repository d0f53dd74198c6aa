use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use crate::types::{TaskId, UserId};

/// Persisted user record, including the credential hash.
///
/// This type never leaves the crate boundary through the API; handlers
/// convert it into [`crate::store::User`], which has no hash field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Database identifier (`user:<user_id>`)
    pub id: RecordId,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string
    pub password: String,
    /// Unix seconds of the last successful login
    #[serde(default)]
    pub last_login: Option<i64>,
    #[serde(default)]
    pub failed_login_attempt: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Payload for inserting a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct UserCreate {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Persisted task record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Database identifier (`task:<task_id>`)
    pub id: RecordId,
    pub task_id: TaskId,
    /// Owning user
    pub user_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub date_completed: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Row of the `sequence` table.
#[derive(Debug, Clone, Deserialize)]
pub struct SequenceRecord {
    pub last_value: i64,
}
