use std::sync::Arc;

use anyhow::anyhow;

use crate::auth::TokenService;
use crate::config::Config;
use crate::db::Database;
use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl()?);
        Ok(Self {
            config: Arc::new(config),
            tokens,
        })
    }

    /// Open a connection on a blocking worker, run `f`, and drop the
    /// connection before returning.
    pub async fn with_db<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Database) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.config.database_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut db = Database::open_at(&path)?;
            f(&mut db)
        })
        .await
        .map_err(|e| AppError::Internal(anyhow!("database task failed: {e}")))?
    }
}
