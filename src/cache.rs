//! Bounded TTL cache for read-heavy queries.
//!
//! Values of any `Clone` type share one `moka` cache keyed by strings of the
//! form `<prefix>:<function>:<args>`, so a whole family of entries can be
//! dropped with [`QueryCache::invalidate_prefix`] after a write.

use std::any::Any;
use std::fmt::{self, Debug, Display};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CacheConfig;

type Stored = Arc<dyn Any + Send + Sync>;

/// Cache key builder: `CacheKey::new("listings", "get").arg(42)` renders as
/// `listings:get:42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    prefix: &'static str,
    rendered: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(prefix: &'static str, function: &str) -> Self {
        Self {
            prefix,
            rendered: format!("{prefix}:{function}"),
        }
    }

    /// Appends one argument using its `Debug` form, so `None` and `Some("")`
    /// produce different keys.
    #[must_use]
    pub fn arg(mut self, value: impl Debug) -> Self {
        self.rendered.push_str(&format!(":{value:?}"));
        self
    }

    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        self.prefix
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub entry_count: u64,
    pub max_entries: u64,
    pub ttl_seconds: u64,
    pub hits: u64,
    pub misses: u64,
}

pub struct QueryCache {
    inner: Option<Cache<String, Stored>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let inner = config.enabled.then(|| {
            Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(Duration::from_secs(config.ttl_seconds.max(1)))
                .support_invalidation_closures()
                .build()
        });

        Self {
            inner,
            config: config.clone(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Returns the cached value for `key`, or runs `loader` and stores its
    /// successful result. Errors pass through and are never stored.
    pub async fn get_or_try_load<T, E, F, Fut>(&self, key: &CacheKey, loader: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(cache) = &self.inner else {
            return loader().await;
        };

        if let Some(stored) = cache.get(key.as_str()).await {
            if let Some(value) = stored.downcast_ref::<T>() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("cache_hits_total", "prefix" => key.prefix()).increment(1);
                return Ok(value.clone());
            }
            warn!(key = %key, "Cached value has unexpected type, reloading");
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("cache_misses_total", "prefix" => key.prefix()).increment(1);

        let value = loader().await?;
        cache
            .insert(key.to_string(), Arc::new(value.clone()) as Stored)
            .await;
        Ok(value)
    }

    /// Drops every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        let Some(cache) = &self.inner else {
            return;
        };

        let owned = prefix.to_string();
        match cache.invalidate_entries_if(move |key, _| key.starts_with(&owned)) {
            Ok(_) => debug!(prefix, "Cache prefix invalidated"),
            Err(e) => {
                warn!(prefix, error = %e, "Prefix invalidation unavailable, clearing cache");
                cache.invalidate_all();
            }
        }
    }

    pub fn clear(&self) {
        if let Some(cache) = &self.inner {
            cache.invalidate_all();
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let entry_count = match &self.inner {
            Some(cache) => {
                cache.run_pending_tasks().await;
                cache.entry_count()
            }
            None => 0,
        };

        CacheStats {
            enabled: self.is_enabled(),
            entry_count,
            max_entries: self.config.max_entries,
            ttl_seconds: self.config.ttl_seconds,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
