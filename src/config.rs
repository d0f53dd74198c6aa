use anyhow::{Context, bail};
use http::HeaderName;

use crate::auth::AuthConfig;
use crate::db::DatabaseConfig;

/// Everything needed to start the service. Built once in `main`, then moved
/// into [`crate::api::AppState`].
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub db: DatabaseConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Env defaults for both sections.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Reject a configuration the server cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.db.url.trim().is_empty() {
            bail!("database url must not be empty");
        }
        if self.auth.signing_key.is_empty() {
            bail!("signing key must not be empty (set TASKS_SIGNING_KEY or --signing-key)");
        }
        if self.auth.token_ttl_minutes <= 0 {
            bail!(
                "token lifetime must be positive, got {} minutes",
                self.auth.token_ttl_minutes
            );
        }
        self.token_header()?;
        Ok(())
    }

    /// The configured token header as an HTTP header name.
    pub fn token_header(&self) -> anyhow::Result<HeaderName> {
        HeaderName::from_bytes(self.auth.token_header.to_ascii_lowercase().as_bytes())
            .with_context(|| format!("invalid token header name: {:?}", self.auth.token_header))
    }
}
