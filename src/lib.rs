// Core modules
pub mod api;
pub mod auth;
mod config;
mod db;
mod error;
mod service;
mod store;
mod types;

// Re-export key types and functions
pub use api::{AppState, create_admin_router, create_public_router};
pub use auth::{AuthConfig, TokenClaims, TokenService, UserContext};
pub use config::AppConfig;
pub use db::{DatabaseConfig, Db, create_connection, ensure_schema};
pub use error::{AppError, AppResult};
pub use service::{AccountService, LoginRequest, RegisterRequest};
pub use store::{MAX_PAGE_SIZE, NewTask, Page, PageRequest, Task, TaskStore, User, UserStore};
pub use types::{TaskId, UserId};

use anyhow::Result;
use axum::Router;

/// Convenience function to connect, apply the schema and build both routers.
///
/// Returns `(public, admin)`.
pub async fn create_app(config: AppConfig) -> Result<(Router, Router)> {
    config.validate()?;

    let db = create_connection(config.db.clone()).await?;
    ensure_schema(&db).await?;

    let state = AppState::new(db, &config)?;
    Ok((
        create_public_router(state.clone()),
        create_admin_router(state),
    ))
}
