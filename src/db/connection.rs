use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("TASKS_DB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("TASKS_DB_NAMESPACE").unwrap_or_else(|_| "tasks".to_string()),
            database: env::var("TASKS_DB_DATABASE").unwrap_or_else(|_| "tracker".to_string()),
            username: env::var("TASKS_DB_USERNAME").ok(),
            password: env::var("TASKS_DB_PASSWORD").ok(),
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

/// Apply table, field and index definitions. Safe to run on every startup.
pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = [
        // Users. Optional fields (last_login) are left undeclared.
        "DEFINE TABLE IF NOT EXISTS user SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS user_id ON TABLE user TYPE int;
         DEFINE FIELD IF NOT EXISTS name ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS email ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS password ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS failed_login_attempt ON TABLE user TYPE int DEFAULT 0;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE user TYPE int;
         DEFINE FIELD IF NOT EXISTS updated_at ON TABLE user TYPE int;",
        // Tasks. due_date and date_completed are optional and undeclared.
        "DEFINE TABLE IF NOT EXISTS task SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS task_id ON TABLE task TYPE int;
         DEFINE FIELD IF NOT EXISTS user_id ON TABLE task TYPE int;
         DEFINE FIELD IF NOT EXISTS title ON TABLE task TYPE string;
         DEFINE FIELD IF NOT EXISTS description ON TABLE task TYPE string;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE task TYPE int;
         DEFINE FIELD IF NOT EXISTS updated_at ON TABLE task TYPE int;",
        // Id allocation, one row per table
        "DEFINE TABLE IF NOT EXISTS sequence SCHEMALESS;",
        "DEFINE INDEX IF NOT EXISTS user_email ON TABLE user COLUMNS email UNIQUE;
         DEFINE INDEX IF NOT EXISTS user_user_id ON TABLE user COLUMNS user_id UNIQUE;
         DEFINE INDEX IF NOT EXISTS task_task_id ON TABLE task COLUMNS task_id UNIQUE;
         DEFINE INDEX IF NOT EXISTS task_owner ON TABLE task COLUMNS user_id;",
    ];

    for query in schema_queries {
        db.query(query).await?.check()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db).await.unwrap();
        ensure_schema(&db).await.unwrap();
    }
}
