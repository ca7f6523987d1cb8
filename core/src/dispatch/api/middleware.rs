// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! CORS and rate-limiting middleware for the Dispatcher API. CORS
//! follows the teacher's `CorsConfig::to_layer` pass-through almost
//! verbatim; the rate limiter replaces the teacher's `tower-governor`
//! stub with a real fixed-window counter per §6's `rateLimitWindowMs`/
//! `rateLimitMax` options.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use tower_http::cors::{Any, CorsLayer};

use crate::dispatch::api::server::AppState;
use crate::dispatch::error::DispatchError;

/// CORS allow-list configuration, straight from §6's `allowedOrigins`
/// option.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl CorsConfig {
    pub fn to_layer(&self) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any);

        if self.allowed_origins.iter().any(|o| o == "*") {
            layer.allow_origin(Any)
        } else {
            layer.allow_origin(
                self.allowed_origins
                    .iter()
                    .filter_map(|o| o.parse::<HeaderValue>().ok())
                    .collect::<Vec<_>>(),
            )
        }
    }
}

/// Fixed-window rate limit configuration.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub window: Duration,
    pub max_requests: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(60_000),
            max_requests: 100,
        }
    }
}

struct Window {
    started_at: Instant,
    count: u32,
}

/// A fixed-window counter per client key (remote IP). Each key's window
/// resets once `config.window` has elapsed since it started.
pub struct RateLimiter {
    config: RateLimiterConfig,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn check(&self, key: &str) -> Result<(), DispatchError> {
        let now = Instant::now();
        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) >= self.config.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= self.config.max_requests {
            let elapsed = now.duration_since(entry.started_at);
            let retry_after = self.config.window.saturating_sub(elapsed);
            return Err(DispatchError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            });
        }

        entry.count += 1;
        Ok(())
    }
}

/// Axum middleware entry point: keys the fixed-window counter by the
/// caller's remote address.
pub async fn rate_limit_layer(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
    next: Next,
) -> Result<Response, DispatchError> {
    state.rate_limiter.check(&addr.ip().to_string())?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_under_the_limit() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            window: Duration::from_secs(60),
            max_requests: 3,
        });
        for _ in 0..3 {
            assert!(limiter.check("client-a").is_ok());
        }
    }

    #[test]
    fn rejects_requests_over_the_limit() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            window: Duration::from_secs(60),
            max_requests: 2,
        });
        assert!(limiter.check("client-a").is_ok());
        assert!(limiter.check("client-a").is_ok());
        let err = limiter.check("client-a").unwrap_err();
        assert!(matches!(err, DispatchError::RateLimited { .. }));
    }

    #[test]
    fn tracks_distinct_clients_independently() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            window: Duration::from_secs(60),
            max_requests: 1,
        });
        assert!(limiter.check("client-a").is_ok());
        assert!(limiter.check("client-b").is_ok());
        assert!(limiter.check("client-a").is_err());
    }
}
