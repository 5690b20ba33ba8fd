use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::error;

use yatube_db::Database;

use crate::cache::PageCache;
use crate::error::ApiError;
use crate::media::MediaStorage;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub cache: Arc<dyn PageCache>,
    pub cache_ttl: CacheTtl,
    pub media: MediaStorage,
}

/// How long cached pages stay fresh.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtl {
    /// Post listings and the user directory.
    pub feed: Duration,
    /// The group directory.
    pub groups: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            feed: Duration::from_secs(20),
            groups: Duration::from_secs(60),
        }
    }
}

/// Runs blocking DB work off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!("blocking task failed: {}", e))
        })?
        .map_err(ApiError::Internal)
}
