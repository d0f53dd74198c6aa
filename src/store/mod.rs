//! Resource access layer: ownership-scoped task operations, user operations,
//! and the cursor pagination contract they share.
//!
//! Every task query carries the caller's user id in the same predicate that
//! selects the row, so a task owned by someone else looks exactly like one
//! that does not exist.

mod pagination;
mod task_store;
mod user_store;

pub use pagination::{MAX_PAGE_SIZE, Page, PageParams, PageRequest};
pub use task_store::TaskStore;
pub use user_store::UserStore;

use serde::{Deserialize, Serialize};

use crate::db::{TaskRecord, UserRecord};
use crate::types::{TaskId, UserId};

/// A user as exposed to callers. Has no credential field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<i64>,
    pub failed_login_attempt: i64,
    #[serde(rename = "dateCreated")]
    pub created_at: i64,
    #[serde(rename = "dateUpdated")]
    pub updated_at: i64,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            user_id: record.user_id,
            name: record.name,
            email: record.email,
            last_login: record.last_login,
            failed_login_attempt: record.failed_login_attempt,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// A task as exposed to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: TaskId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<i64>,
    #[serde(rename = "dateCreated")]
    pub created_at: i64,
    #[serde(rename = "dateUpdated")]
    pub updated_at: i64,
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        Self {
            task_id: record.task_id,
            user_id: record.user_id,
            title: record.title,
            description: record.description,
            due_date: record.due_date,
            date_completed: record.date_completed,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Client input for a new task.
///
/// No owner field: the owner always comes from the verified caller, and
/// unknown JSON fields such as `userId` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub date_completed: Option<i64>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_json_has_no_credential() {
        let user = User {
            user_id: UserId::new(1),
            name: "A".into(),
            email: "a@x.com".into(),
            last_login: None,
            failed_login_attempt: 2,
            created_at: 10,
            updated_at: 11,
        };
        let body = serde_json::to_value(&user).unwrap();
        assert_eq!(
            body,
            json!({
                "userId": 1,
                "name": "A",
                "email": "a@x.com",
                "failedLoginAttempt": 2,
                "dateCreated": 10,
                "dateUpdated": 11
            })
        );
    }

    #[test]
    fn test_new_task_ignores_client_owner() {
        let task: NewTask =
            serde_json::from_str(r#"{"title": "t", "userId": 999, "dueDate": 5}"#).unwrap();
        assert_eq!(task.title, "t");
        assert_eq!(task.due_date, Some(5));
        assert_eq!(task.description, "");
    }
}
