// REST API endpoints for the task tracker

pub mod response;

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderName, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{TokenService, UserContext, require_auth};
use crate::config::AppConfig;
use crate::db::Db;
use crate::error::{AppError, AppResult};
use crate::service::{AccountService, LoginRequest, RegisterRequest};
use crate::store::{NewTask, Page, PageParams, PageRequest, Task, TaskStore, User, UserStore};
use crate::types::{TaskId, UserId};

use response::{ApiResponse, LoginData};

/// Shared state of both routers. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    tokens: Arc<TokenService>,
    users: Arc<UserStore>,
    tasks: Arc<TaskStore>,
    accounts: Arc<AccountService>,
    token_header: HeaderName,
}

impl AppState {
    pub fn new(db: Db, config: &AppConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let tokens = Arc::new(TokenService::new(&config.auth)?);
        let users = Arc::new(UserStore::new(db.clone()));
        let tasks = Arc::new(TaskStore::new(db));
        let accounts = Arc::new(AccountService::new(users.clone(), tokens.clone()));

        Ok(Self {
            tokens,
            users,
            tasks,
            accounts,
            token_header: config.token_header()?,
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn token_header(&self) -> &HeaderName {
        &self.token_header
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }
}

pub fn create_public_router(state: AppState) -> Router {
    let auth = Router::new()
        .route("/register", post(register))
        .route("/login", post(login));

    // Everything below passes through the auth gate first
    let secured = Router::new()
        .route("/tasks", get(list_tasks).post(add_task))
        .route("/tasks/{task_id}", get(get_task))
        .route("/users/me", get(current_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth)
        .nest("/api/secured", secured)
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(page_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Operator-only routes. Bind this router to a trusted interface.
pub fn create_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/users", get(list_users).post(add_user))
        .route("/users/{user_id}", get(get_user))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(page_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserCreated {
    user_id: UserId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskCreated {
    task_id: TaskId,
}

type ApiResult<T> = AppResult<(StatusCode, Json<ApiResponse<T>>)>;

fn ok<T: Serialize>(message: impl Into<String>, data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::with_data(message, data))))
}

fn created<T: Serialize>(message: impl Into<String>, data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::with_data(message, data))))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(v)| v)
        .map_err(|e| AppError::validation(format!("invalid request body: {}", e.body_text())))
}

fn page_request(params: Result<Query<PageParams>, QueryRejection>) -> AppResult<PageRequest> {
    let Query(params) = params
        .map_err(|e| AppError::validation(format!("invalid query: {}", e.body_text())))?;
    PageRequest::try_from(params)
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn page_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::message("page not found")),
    )
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ApiResponse::<()>::message("method not allowed")),
    )
}

async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<UserCreated> {
    let user_id = state.accounts().register(json_body(body)?).await?;
    created("successfully registered user", UserCreated { user_id })
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginData> {
    let issued = state.accounts().login(json_body(body)?).await?;
    ok(
        "successfully logged in user",
        LoginData {
            token: issued.token,
            expires_at: issued.expires_at,
        },
    )
}

async fn add_task(
    State(state): State<AppState>,
    ctx: UserContext,
    body: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<TaskCreated> {
    let task_id = state.tasks().add_task(ctx.user_id(), json_body(body)?).await?;
    created("successfully added a task", TaskCreated { task_id })
}

async fn list_tasks(
    State(state): State<AppState>,
    ctx: UserContext,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Page<Task>> {
    let page = state
        .tasks()
        .list_tasks(ctx.user_id(), page_request(params)?)
        .await?;
    ok(
        format!("successfully retrieved {} task/s", page.items.len()),
        page,
    )
}

async fn get_task(
    State(state): State<AppState>,
    ctx: UserContext,
    Path(raw): Path<String>,
) -> ApiResult<Task> {
    let task_id: TaskId = raw
        .parse()
        .map_err(|_| AppError::validation("task id is invalid"))?;

    let task = state.tasks().get_task(ctx.user_id(), task_id).await?;
    ok(format!("successfully retrieved task with id {}", task_id), task)
}

async fn current_user(State(state): State<AppState>, ctx: UserContext) -> ApiResult<User> {
    let user = state.users().get_user(ctx.user_id()).await?;
    ok("successfully retrieved user", user)
}

async fn add_user(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<UserCreated> {
    let user_id = state.accounts().register(json_body(body)?).await?;
    created("successfully added user", UserCreated { user_id })
}

async fn list_users(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Page<User>> {
    let page = state.users().list_users(page_request(params)?).await?;
    ok(
        format!("successfully retrieved {} user/s", page.items.len()),
        page,
    )
}

async fn get_user(State(state): State<AppState>, Path(raw): Path<String>) -> ApiResult<User> {
    let user_id: UserId = raw
        .parse()
        .map_err(|_| AppError::validation("user id is invalid"))?;

    let user = state.users().get_user(user_id).await?;
    ok(format!("successfully retrieved user with id {}", user_id), user)
}
