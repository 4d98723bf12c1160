//! Per-IP fixed-window rate limiting.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

struct WindowState {
    counts: HashMap<String, u32>,
    last_reset: Instant,
}

/// Fixed-window request counter per client IP.
///
/// The whole table is wiped when the window elapses, so a client's budget
/// refills all at once. Counting is per process; a multi-instance
/// deployment divides accuracy by the instance count, which is accepted.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::new(WindowState {
                counts: HashMap::new(),
                last_reset: Instant::now(),
            }),
        }
    }

    /// Counts one request for `client`; `Err` carries the retry-after hint
    /// in seconds.
    pub fn check(&self, client: &str) -> Result<(), f64> {
        let mut state = self.state.lock().expect("rate limiter lock poisoned");

        let now = Instant::now();
        if now.duration_since(state.last_reset) > self.window {
            state.counts.clear();
            state.last_reset = now;
        }

        let count = state.counts.entry(client.to_string()).or_insert(0);
        if *count >= self.max_requests {
            return Err(self.window.as_secs_f64());
        }
        *count += 1;
        Ok(())
    }
}

fn client_ip(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Axum middleware wrapping [`RateLimiter::check`].
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check(&client_ip(&request)) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Rate limit exceeded",
                "retry_after": retry_after,
            })),
        )
            .into_response(),
    }
}
