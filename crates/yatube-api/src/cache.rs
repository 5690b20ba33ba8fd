//! Read-through page cache for rendered listing views.
//!
//! Entries are addressed by a view key and carry their own time-to-live.
//! Writes to the store never invalidate cached pages: a new post may be
//! missing from a cached listing until the entry expires.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use moka::Expiry;
use moka::future::Cache;
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;

/// Expiring key-value store holding rendered pages.
#[async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Bytes>;
    async fn put(&self, key: String, page: Bytes, ttl: Duration);
    fn invalidate_all(&self);
}

#[derive(Clone)]
struct CachedPage {
    body: Bytes,
    ttl: Duration,
}

struct PageExpiry;

impl Expiry<String, CachedPage> for PageExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedPage,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process [`PageCache`] backed by moka with per-entry expiry.
pub struct MokaPageCache {
    pages: Cache<String, CachedPage>,
}

impl MokaPageCache {
    pub fn new(max_pages: u64) -> Self {
        let pages = Cache::builder()
            .max_capacity(max_pages)
            .expire_after(PageExpiry)
            .build();
        Self { pages }
    }
}

#[async_trait]
impl PageCache for MokaPageCache {
    async fn get(&self, key: &str) -> Option<Bytes> {
        self.pages.get(key).await.map(|page| page.body)
    }

    async fn put(&self, key: String, page: Bytes, ttl: Duration) {
        self.pages.insert(key, CachedPage { body: page, ttl }).await;
    }

    fn invalidate_all(&self) {
        self.pages.invalidate_all();
    }
}

/// Caches nothing; every lookup misses.
pub struct NoopCache;

#[async_trait]
impl PageCache for NoopCache {
    async fn get(&self, _key: &str) -> Option<Bytes> {
        None
    }

    async fn put(&self, _key: String, _page: Bytes, _ttl: Duration) {}

    fn invalidate_all(&self) {}
}

/// Serve `key` from the cache, or render it, store it and serve it.
pub async fn cached_json<T, F, Fut>(
    cache: &dyn PageCache,
    key: String,
    ttl: Duration,
    render: F,
) -> Result<Response, ApiError>
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    if let Some(body) = cache.get(&key).await {
        debug!("Page cache HIT {}", key);
        return Ok(json_response(body));
    }

    debug!("Page cache MISS {}", key);
    let view = render().await?;
    let body = Bytes::from(serde_json::to_vec(&view).map_err(anyhow::Error::from)?);
    cache.put(key, body.clone(), ttl).await;
    Ok(json_response(body))
}

fn json_response(body: Bytes) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
