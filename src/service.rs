//! Registration and login.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{IssuedToken, TokenService};
use crate::db::UserCreate;
use crate::error::{AppError, AppResult};
use crate::store::{User, UserStore};
use crate::types::UserId;

/// Same text for unknown email and wrong password.
pub const BAD_CREDENTIALS: &str = "email or password is incorrect";

/// Registration payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Orchestrates the user store, password hashing and token issuance.
pub struct AccountService {
    users: Arc<UserStore>,
    tokens: Arc<TokenService>,
}

impl AccountService {
    pub fn new(users: Arc<UserStore>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    /// Register a new user. The plaintext password is only ever hashed.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<UserId> {
        if request.email.is_empty() {
            return Err(AppError::validation("field email is required"));
        }
        if request.password.is_empty() {
            return Err(AppError::validation("field password is required"));
        }
        if request.name.is_empty() {
            return Err(AppError::validation("field name is required"));
        }

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "user with email [{}] exists",
                request.email
            )));
        }

        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::storage("failed to register user", e))?
            .map_err(|e| AppError::storage("failed to register user", e))?;

        let user_id = self
            .users
            .add_user(UserCreate {
                name: request.name,
                email: request.email,
                password_hash,
            })
            .await?;

        info!(user_id = %user_id, "user registered");
        Ok(user_id)
    }

    /// Check credentials and issue a token.
    pub async fn login(&self, request: LoginRequest) -> AppResult<IssuedToken> {
        let Some(record) = self.users.find_by_email(&request.email).await? else {
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };

        let hash = record.password.clone();
        let password = request.password;
        let matches = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
            .await
            .map_err(|e| AppError::storage("failed to verify credentials", e))?;

        if !matches {
            // Best-effort: the caller gets the same answer either way
            match self.users.record_failed_login(record.user_id).await {
                Ok(count) => {
                    warn!(user_id = %record.user_id, failed_attempts = count, "login failed")
                }
                Err(e) => {
                    warn!(user_id = %record.user_id, error = %e, "failed to update failed login attempts")
                }
            }
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        let user = User::from(record);
        let issued = self.tokens.issue(&user).map_err(|e| {
            error!(user_id = %user.user_id, error = %e, "failed to issue token");
            AppError::Unauthorized(BAD_CREDENTIALS.to_string())
        })?;

        if let Err(e) = self
            .users
            .record_login(user.user_id, Utc::now().timestamp())
            .await
        {
            warn!(user_id = %user.user_id, error = %e, "failed to update last login");
        }

        info!(user_id = %user.user_id, "user logged in");
        Ok(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use crate::db::{DatabaseConfig, create_connection, ensure_schema};
    use crate::store::PageRequest;

    async fn setup() -> (AccountService, Arc<UserStore>, Arc<TokenService>) {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db).await.unwrap();

        let users = Arc::new(UserStore::new(db));
        let tokens = Arc::new(TokenService::new(&AuthConfig::with_signing_key("svc-test")).unwrap());
        (
            AccountService::new(users.clone(), tokens.clone()),
            users,
            tokens,
        )
    }

    fn register_a() -> RegisterRequest {
        RegisterRequest {
            name: "A".to_string(),
            email: "a@x.com".to_string(),
            password: "p".to_string(),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_plaintext() {
        let (svc, users, _) = setup().await;
        svc.register(register_a()).await.unwrap();

        let record = users.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_ne!(record.password, "p");
        assert!(verify_password(&record.password, "p"));
    }

    #[tokio::test]
    async fn test_register_twice_conflicts() {
        let (svc, _, _) = setup().await;
        svc.register(register_a()).await.unwrap();

        let err = svc.register(register_a()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_empty_password_persists_nothing() {
        let (svc, users, _) = setup().await;

        let err = svc
            .register(RegisterRequest {
                password: String::new(),
                ..register_a()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert!(users.find_by_email("a@x.com").await.unwrap().is_none());
        let page = users.list_users(PageRequest::first(10).unwrap()).await.unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_register_empty_email_or_name() {
        let (svc, _, _) = setup().await;

        let no_email = RegisterRequest {
            email: String::new(),
            ..register_a()
        };
        let no_name = RegisterRequest {
            name: String::new(),
            ..register_a()
        };

        for request in [no_email, no_name] {
            let err = svc.register(request).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_wrong_password_increments_counter_once() {
        let (svc, users, _) = setup().await;
        let id = svc.register(register_a()).await.unwrap();

        let err = svc.login(login("a@x.com", "wrong")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == BAD_CREDENTIALS));

        assert_eq!(users.get_user(id).await.unwrap().failed_login_attempt, 1);
    }

    #[tokio::test]
    async fn test_unknown_email_same_message_no_increment() {
        let (svc, users, _) = setup().await;
        let id = svc.register(register_a()).await.unwrap();

        let unknown = svc.login(login("nobody@x.com", "p")).await.unwrap_err();
        let wrong = svc.login(login("a@x.com", "nope")).await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());

        // Only the wrong-password attempt counted
        assert_eq!(users.get_user(id).await.unwrap().failed_login_attempt, 1);
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let (svc, users, tokens) = setup().await;
        let id = svc.register(register_a()).await.unwrap();

        let issued = svc.login(login("a@x.com", "p")).await.unwrap();
        let claims = tokens.verify(&issued.token).unwrap();

        assert_eq!(claims.user_id, id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.name, "A");
        assert_eq!(claims.exp, issued.expires_at);

        let user = users.get_user(id).await.unwrap();
        assert!(user.last_login.is_some());
        assert_eq!(user.failed_login_attempt, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_registration_conflicts() {
        let (svc, _, _) = setup().await;
        let svc = Arc::new(svc);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.register(register_a()).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, AppError::Conflict(_)), "{}", err),
            }
        }
        assert_eq!(created, 1);
    }
}
