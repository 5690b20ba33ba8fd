mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use yatube_api::cache::MokaPageCache;
use yatube_api::media::MediaStorage;
use yatube_api::{AppState, AppStateInner, CacheTtl};

use crate::config::Config;

/// Upper bound on distinct cached pages.
const MAX_CACHED_PAGES: u64 = 10_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "yatube_server=debug,yatube_api=debug,yatube_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and media storage
    let db = yatube_db::Database::open(&config.db_path)?;
    let media = MediaStorage::new(config.media_dir.clone()).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        cache: Arc::new(MokaPageCache::new(MAX_CACHED_PAGES)),
        cache_ttl: CacheTtl {
            feed: config.feed_cache_ttl,
            groups: config.groups_cache_ttl,
        },
        media,
    });

    let app = yatube_api::router(state, config.max_upload_bytes).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Yatube listening on {}", addr);
    info!(
        "Page cache TTLs: feeds {:?}, groups {:?}",
        config.feed_cache_ttl, config.groups_cache_ttl
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
