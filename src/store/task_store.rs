//! Ownership-scoped task storage.

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::db::{Db, QueryBuilder, TaskRecord};
use crate::error::{AppError, AppResult, StorageContext};
use crate::store::pagination::{Page, PageRequest};
use crate::store::{NewTask, Task};
use crate::types::{TaskId, UserId};

/// Task store for database operations.
///
/// Every method takes the owner explicitly; there is no unscoped read path.
pub struct TaskStore {
    db: Db,
    /// Held across id allocation and insert; the sequence row is shared.
    write_lock: Mutex<()>,
}

impl TaskStore {
    pub fn new(db: Db) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a task owned by `owner`.
    pub async fn add_task(&self, owner: UserId, task: NewTask) -> AppResult<TaskId> {
        if task.title.trim().is_empty() {
            return Err(AppError::validation("field title is required"));
        }

        let _guard = self.write_lock.lock().await;
        let task_id = QueryBuilder::next_id(&self.db, "task")
            .await
            .storage_context("failed to allocate task id")?;
        let now = Utc::now().timestamp();

        let query = r#"
            CREATE type::thing('task', $task_id) CONTENT {
                task_id: $task_id,
                user_id: $user_id,
                title: $title,
                description: $description,
                due_date: $due_date,
                date_completed: $date_completed,
                created_at: $now,
                updated_at: $now
            }
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("task_id", task_id))
            .bind(("user_id", owner))
            .bind(("title", task.title))
            .bind(("description", task.description))
            .bind(("due_date", task.due_date))
            .bind(("date_completed", task.date_completed))
            .bind(("now", now))
            .await
            .storage_context("failed to add task")?;

        let created: Option<TaskRecord> = res.take(0).storage_context("failed to add task")?;
        let created = created.ok_or_else(|| {
            AppError::storage("failed to add task", anyhow::anyhow!("no row returned"))
        })?;

        info!(user_id = %owner, task_id = %created.task_id, "task added");
        Ok(created.task_id)
    }

    /// Fetch one task of `owner`.
    ///
    /// Owner and id are matched in a single predicate; a task belonging to
    /// another user is reported as not found.
    pub async fn get_task(&self, owner: UserId, task_id: TaskId) -> AppResult<Task> {
        let query = r#"
            SELECT * FROM task
            WHERE user_id = $user_id AND task_id = $task_id
            LIMIT 1
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("user_id", owner))
            .bind(("task_id", task_id))
            .await
            .storage_context("failed to get task")?;

        let tasks: Vec<TaskRecord> = res.take(0).storage_context("failed to get task")?;
        tasks
            .into_iter()
            .next()
            .map(Task::from)
            .ok_or_else(|| AppError::NotFound("task not found".to_string()))
    }

    /// One page of `owner`'s tasks, newest first.
    pub async fn list_tasks(&self, owner: UserId, page: PageRequest) -> AppResult<Page<Task>> {
        let query = r#"
            SELECT * FROM task WITH NOINDEX
            WHERE user_id = $user_id AND task_id < $before
            ORDER BY task_id DESC
            LIMIT $limit
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("user_id", owner))
            .bind(("before", page.upper_bound()))
            .bind(("limit", page.limit()))
            .await
            .storage_context("failed to get tasks")?;

        let records: Vec<TaskRecord> = res.take(0).storage_context("failed to get tasks")?;
        debug!(user_id = %owner, count = records.len(), last_id = page.last_id(), "listed tasks");

        let tasks = records.into_iter().map(Task::from).collect();
        Ok(Page::new(tasks, page, |t: &Task| t.task_id.get()))
    }
}
