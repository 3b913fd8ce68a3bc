//! Per-client sliding-window rate limiting.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::api::{ApiError, AppState};
use crate::config::RateLimitConfig;

/// Key used when the peer address is not available on the request.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Paths never counted against a client.
const EXEMPT_PREFIXES: &[&str] = &["/health", "/metrics"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Denied { retry_after: u64 },
}

impl RateLimitDecision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Sliding-window log: each client keeps the instants of its requests inside
/// the current window.
pub struct RateLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    enabled: bool,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            enabled: config.enabled,
            limit: config.requests_per_window,
            window: Duration::from_secs(config.window_seconds.max(1)),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    /// Records a request from `key` at `now` if it fits in the window.
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        if !self.enabled {
            return RateLimitDecision::Allowed {
                remaining: u32::MAX,
            };
        }

        let mut log = self.windows.entry(key.to_string()).or_default();
        while let Some(&oldest) = log.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                log.pop_front();
            } else {
                break;
            }
        }

        let used = u32::try_from(log.len()).unwrap_or(u32::MAX);
        if used >= self.limit {
            let retry_after = log.front().map_or(self.window, |oldest| {
                self.window
                    .saturating_sub(now.saturating_duration_since(*oldest))
            });
            // Round up so clients never retry a moment too early.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            return RateLimitDecision::Denied {
                retry_after: secs.max(1),
            };
        }

        log.push_back(now);
        RateLimitDecision::Allowed {
            remaining: self.limit - used - 1,
        }
    }

    /// Removes clients whose newest request has left the window.
    pub fn purge_idle(&self) -> usize {
        self.purge_idle_at(Instant::now())
    }

    pub fn purge_idle_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, log| {
            log.back()
                .is_some_and(|last| now.saturating_duration_since(*last) < self.window)
        });
        let removed = before.saturating_sub(self.windows.len());

        if removed > 0 {
            tracing::debug!(
                removed,
                remaining = self.windows.len(),
                "Purged idle rate-limit entries"
            );
        }
        removed
    }

    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// Spawns the periodic purge of idle clients; runs once per window.
pub fn spawn_purge_task(limiter: Arc<RateLimiter>) -> Option<tokio::task::JoinHandle<()>> {
    if !limiter.is_enabled() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(limiter.window());
        interval.tick().await;
        loop {
            interval.tick().await;
            limiter.purge_idle();
        }
    }))
}

fn client_key(req: &Request<Body>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(
            || UNKNOWN_CLIENT.to_string(),
            |ConnectInfo(addr)| addr.ip().to_string(),
        )
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let limiter = state.rate_limiter();
    if !limiter.is_enabled() {
        return next.run(req).await;
    }

    let path = req.uri().path();
    if EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return next.run(req).await;
    }

    let key = client_key(&req);
    match limiter.check(&key) {
        RateLimitDecision::Allowed { remaining } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            if let Ok(v) = HeaderValue::from_str(&limiter.limit().to_string()) {
                headers.insert("X-RateLimit-Limit", v);
            }
            if let Ok(v) = HeaderValue::from_str(&remaining.to_string()) {
                headers.insert("X-RateLimit-Remaining", v);
            }
            response
        }
        RateLimitDecision::Denied { retry_after } => {
            metrics::counter!("rate_limited_total").increment(1);
            tracing::warn!(client = %key, retry_after, "Rate limit exceeded");

            ApiError::RateLimited(retry_after).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(limit: u32, window_seconds: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            requests_per_window: limit,
            window_seconds,
        })
    }

    #[test]
    fn test_allows_up_to_limit_then_denies() {
        let limiter = limiter(3, 60);
        let now = Instant::now();

        assert_eq!(
            limiter.check_at("1.2.3.4", now),
            RateLimitDecision::Allowed { remaining: 2 }
        );
        assert!(limiter.check_at("1.2.3.4", now).is_allowed());
        assert!(limiter.check_at("1.2.3.4", now).is_allowed());
        assert_eq!(
            limiter.check_at("1.2.3.4", now),
            RateLimitDecision::Denied { retry_after: 60 }
        );
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at("a", now).is_allowed());
        assert!(!limiter.check_at("a", now).is_allowed());
        assert!(limiter.check_at("b", now).is_allowed());
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(2, 10);
        let start = Instant::now();

        assert!(limiter.check_at("a", start).is_allowed());
        assert!(limiter.check_at("a", start + Duration::from_secs(4)).is_allowed());

        match limiter.check_at("a", start + Duration::from_secs(6)) {
            RateLimitDecision::Denied { retry_after } => assert_eq!(retry_after, 4),
            other => panic!("expected denial, got {other:?}"),
        }

        // The first request has aged out.
        assert!(limiter.check_at("a", start + Duration::from_secs(10)).is_allowed());
    }

    #[test]
    fn test_disabled_never_denies() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: false,
            requests_per_window: 1,
            window_seconds: 60,
        });
        for _ in 0..10 {
            assert!(limiter.check("a").is_allowed());
        }
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_purge_idle() {
        let limiter = limiter(5, 10);
        let start = Instant::now();

        limiter.check_at("old", start);
        limiter.check_at("fresh", start + Duration::from_secs(8));

        assert_eq!(limiter.purge_idle_at(start + Duration::from_secs(12)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
