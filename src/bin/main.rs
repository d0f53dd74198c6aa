use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use task_tracker::{AppConfig, AuthConfig, DatabaseConfig, create_app};

#[derive(Parser)]
#[command(name = "task-tracker")]
#[command(about = "Multi-tenant task tracking service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the public REST API and the admin API
    Server {
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Bind address for the admin API (internal / trusted only)
        #[arg(long, default_value = "127.0.0.1:8081")]
        admin_bind: String,
        #[arg(long, env = "TASKS_DB_URL", default_value = "memory")]
        db_url: String,
        /// HS256 key used to sign access tokens
        #[arg(long, env = "TASKS_SIGNING_KEY", hide_env_values = true)]
        signing_key: String,
        /// Header carrying the access token on protected routes
        #[arg(long, env = "TASKS_TOKEN_HEADER", default_value = "x-access-token")]
        token_header: String,
        #[arg(long, env = "TASKS_TOKEN_TTL_MINUTES", default_value_t = 300)]
        token_ttl_minutes: i64,
    },
    /// Initialize the database
    Init {
        #[arg(long, env = "TASKS_DB_URL", default_value = "memory")]
        db_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("task_tracker=info".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server {
            port,
            admin_bind,
            db_url,
            signing_key,
            token_header,
            token_ttl_minutes,
        } => {
            let config = AppConfig {
                db: DatabaseConfig {
                    url: db_url,
                    ..Default::default()
                },
                auth: AuthConfig {
                    signing_key,
                    token_header,
                    token_ttl_minutes,
                },
            };
            info!("Using database url for REST server: {}", config.db.url);

            let (public_app, admin_app) = create_app(config).await?;

            let public_listener =
                tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
            let admin_listener = tokio::net::TcpListener::bind(&admin_bind).await?;

            info!("Public server listening on http://0.0.0.0:{}", port);
            info!("Admin server listening on http://{}", admin_bind);

            tokio::try_join!(
                axum::serve(public_listener, public_app),
                axum::serve(admin_listener, admin_app),
            )?;
        }
        Commands::Init { db_url } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url for initialization: {}", db_config.url);

            info!("Initializing database...");
            let db = task_tracker::create_connection(db_config).await?;
            task_tracker::ensure_schema(&db).await?;
            info!("Database initialized successfully");
        }
    }

    Ok(())
}
