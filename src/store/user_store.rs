//! User storage: the credential store contract plus user-level operations.

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::db::{Db, QueryBuilder, UserCreate, UserRecord};
use crate::error::{AppError, AppResult, StorageContext};
use crate::store::pagination::{Page, PageRequest};
use crate::store::User;
use crate::types::UserId;

/// User store for database operations.
pub struct UserStore {
    db: Db,
    /// Serializes writes: id allocation plus insert, and the counter updates.
    write_lock: Mutex<()>,
}

impl UserStore {
    /// Create a new user store.
    pub fn new(db: Db) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
        }
    }

    /// Look up a user by email, including the credential hash.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM user WHERE email = $email LIMIT 1")
            .bind(("email", email.to_string()))
            .await
            .storage_context("failed to look up user")?;

        let users: Vec<UserRecord> = res.take(0).storage_context("failed to look up user")?;
        Ok(users.into_iter().next())
    }

    /// Look up a user by id, including the credential hash.
    pub async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM user WHERE user_id = $user_id LIMIT 1")
            .bind(("user_id", user_id))
            .await
            .storage_context("failed to look up user")?;

        let users: Vec<UserRecord> = res.take(0).storage_context("failed to look up user")?;
        Ok(users.into_iter().next())
    }

    /// Insert a user. The email UNIQUE index turns a duplicate into `Conflict`.
    async fn insert(&self, create: UserCreate) -> AppResult<UserRecord> {
        let _guard = self.write_lock.lock().await;
        let user_id = QueryBuilder::next_id(&self.db, "user")
            .await
            .storage_context("failed to allocate user id")?;
        let now = Utc::now().timestamp();
        let email = create.email.clone();

        let query = r#"
            CREATE type::thing('user', $user_id) CONTENT {
                user_id: $user_id,
                name: $name,
                email: $email,
                password: $password,
                failed_login_attempt: 0,
                created_at: $now,
                updated_at: $now
            }
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("user_id", user_id))
            .bind(("name", create.name))
            .bind(("email", create.email))
            .bind(("password", create.password_hash))
            .bind(("now", now))
            .await
            .storage_context("failed to add user")?;

        let created: Option<UserRecord> = match res.take(0) {
            Ok(created) => created,
            Err(e) if QueryBuilder::is_unique_violation(&e) => {
                return Err(duplicate_email(&email));
            }
            Err(e) => return Err(AppError::storage("failed to add user", e)),
        };

        created.ok_or_else(|| AppError::storage("failed to add user", anyhow::anyhow!("no row returned")))
    }

    /// Atomically add one to the failed-login counter. Returns the new count.
    pub async fn record_failed_login(&self, user_id: UserId) -> AppResult<i64> {
        let query = r#"
            UPDATE type::thing('user', $user_id) SET
                failed_login_attempt += 1,
                updated_at = $now
            RETURN AFTER
        "#;

        let _guard = self.write_lock.lock().await;
        let mut res = self
            .db
            .query(query)
            .bind(("user_id", user_id))
            .bind(("now", Utc::now().timestamp()))
            .await
            .storage_context("failed to update failed login attempts")?;

        let updated: Option<UserRecord> = res
            .take(0)
            .storage_context("failed to update failed login attempts")?;
        updated
            .map(|u| u.failed_login_attempt)
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))
    }

    /// Set the last-login time of a user.
    pub async fn record_login(&self, user_id: UserId, at: i64) -> AppResult<()> {
        let query = r#"
            UPDATE type::thing('user', $user_id) SET
                last_login = $at,
                updated_at = $at
        "#;

        let _guard = self.write_lock.lock().await;
        self.db
            .query(query)
            .bind(("user_id", user_id))
            .bind(("at", at))
            .await
            .storage_context("failed to update last login")?
            .check()
            .storage_context("failed to update last login")?;

        Ok(())
    }

    /// Add a user whose password has already been hashed.
    pub async fn add_user(&self, create: UserCreate) -> AppResult<UserId> {
        if create.email.is_empty() {
            return Err(AppError::validation("field email is required"));
        }
        if create.password_hash.is_empty() {
            return Err(AppError::validation("field password is required"));
        }
        if create.name.is_empty() {
            return Err(AppError::validation("field name is required"));
        }

        if self.find_by_email(&create.email).await?.is_some() {
            return Err(duplicate_email(&create.email));
        }

        let user = self.insert(create).await?;
        info!(user_id = %user.user_id, "user added");
        Ok(user.user_id)
    }

    /// Get a user by id, without the credential hash.
    pub async fn get_user(&self, user_id: UserId) -> AppResult<User> {
        self.find_by_id(user_id)
            .await?
            .map(User::from)
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))
    }

    /// List users, newest first.
    pub async fn list_users(&self, page: PageRequest) -> AppResult<Page<User>> {
        let query = r#"
            SELECT * FROM user WITH NOINDEX
            WHERE user_id < $before
            ORDER BY user_id DESC
            LIMIT $limit
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("before", page.upper_bound()))
            .bind(("limit", page.limit()))
            .await
            .storage_context("failed to get users")?;

        let records: Vec<UserRecord> = res.take(0).storage_context("failed to get users")?;
        debug!(count = records.len(), last_id = page.last_id(), "listed users");

        let users = records.into_iter().map(User::from).collect();
        Ok(Page::new(users, page, |u: &User| u.user_id.get()))
    }
}

fn duplicate_email(email: &str) -> AppError {
    AppError::Conflict(format!("user with email [{}] exists", email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseConfig, create_connection, ensure_schema};
    use std::sync::Arc;

    async fn setup_test_db() -> Db {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db).await.unwrap();
        db
    }

    fn create(name: &str, email: &str) -> UserCreate {
        UserCreate {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_and_get_user() {
        let store = UserStore::new(setup_test_db().await);

        let id = store.add_user(create("A", "a@x.com")).await.unwrap();
        let user = store.get_user(id).await.unwrap();

        assert_eq!(user.user_id, id);
        assert_eq!(user.name, "A");
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.failed_login_attempt, 0);
        assert_eq!(user.last_login, None);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[tokio::test]
    async fn test_find_by_email_returns_hash() {
        let store = UserStore::new(setup_test_db().await);
        store.add_user(create("A", "a@x.com")).await.unwrap();

        let record = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(record.password, "$argon2id$stub");
        assert!(store.find_by_email("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = UserStore::new(setup_test_db().await);
        store.add_user(create("A", "a@x.com")).await.unwrap();

        let err = store.add_user(create("B", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_unique_index_backs_up_conflict_check() {
        let store = UserStore::new(setup_test_db().await);
        store.insert(create("A", "a@x.com")).await.unwrap();

        let err = store.insert(create("B", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_empty_fields_rejected() {
        let store = UserStore::new(setup_test_db().await);

        for bad in [create("", "a@x.com"), create("A", "")] {
            let err = store.add_user(bad).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        let mut no_password = create("A", "a@x.com");
        no_password.password_hash.clear();
        let err = store.add_user(no_password).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let page = store.list_users(PageRequest::first(10).unwrap()).await.unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_user_not_found() {
        let store = UserStore::new(setup_test_db().await);
        let err = store.get_user(UserId::new(42)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_record_failed_login_increments_by_one() {
        let store = UserStore::new(setup_test_db().await);
        let id = store.add_user(create("A", "a@x.com")).await.unwrap();

        assert_eq!(store.record_failed_login(id).await.unwrap(), 1);
        assert_eq!(store.record_failed_login(id).await.unwrap(), 2);
        assert_eq!(store.get_user(id).await.unwrap().failed_login_attempt, 2);
    }

    #[tokio::test]
    async fn test_record_failed_login_unknown_user() {
        let store = UserStore::new(setup_test_db().await);
        let err = store.record_failed_login(UserId::new(9)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_record_login_sets_last_login() {
        let store = UserStore::new(setup_test_db().await);
        let id = store.add_user(create("A", "a@x.com")).await.unwrap();

        store.record_login(id, 1_700_000_000).await.unwrap();

        let user = store.get_user(id).await.unwrap();
        assert_eq!(user.last_login, Some(1_700_000_000));
        assert_eq!(user.updated_at, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_list_users_paginates_descending() {
        let store = UserStore::new(setup_test_db().await);
        for i in 0..5 {
            store
                .add_user(create(&format!("U{}", i), &format!("u{}@x.com", i)))
                .await
                .unwrap();
        }

        let first = store.list_users(PageRequest::first(2).unwrap()).await.unwrap();
        let ids: Vec<i64> = first.items.iter().map(|u| u.user_id.get()).collect();
        assert_eq!(ids, vec![5, 4]);
        assert_eq!(first.last_id, 4);

        let second = store.list_users(first.next_request()).await.unwrap();
        let ids: Vec<i64> = second.items.iter().map(|u| u.user_id.get()).collect();
        assert_eq!(ids, vec![3, 2]);

        let third = store.list_users(second.next_request()).await.unwrap();
        let ids: Vec<i64> = third.items.iter().map(|u| u.user_id.get()).collect();
        assert_eq!(ids, vec![1]);

        let done = store.list_users(third.next_request()).await.unwrap();
        assert!(done.is_empty());
        assert_eq!(done.last_id, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failed_logins_all_counted() {
        let store = Arc::new(UserStore::new(setup_test_db().await));
        let id = store.add_user(create("A", "a@x.com")).await.unwrap();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.record_failed_login(id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.get_user(id).await.unwrap().failed_login_attempt, 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_get_distinct_ids() {
        let store = Arc::new(UserStore::new(setup_test_db().await));

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .add_user(create(&format!("U{}", i), &format!("u{}@x.com", i)))
                        .await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().get());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=12).collect::<Vec<i64>>());
    }
}
