//! Keyed rate limiting
//!
//! Two buckets per client address over a 15-minute window: a strict one
//! for authentication endpoints and a looser one for everything else.
//! State lives in-process; it is the only shared mutable state in the
//! server besides the connection pool.

use std::num::NonZeroU32;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::warn;

use crate::error::ApiError;
use crate::extract::address_from_parts;
use crate::state::AppState;

const WINDOW: Duration = Duration::from_secs(15 * 60);

/// The two per-address buckets.
pub struct RateLimiters {
    auth: DefaultKeyedRateLimiter<String>,
    general: DefaultKeyedRateLimiter<String>,
}

impl RateLimiters {
    /// Builds the buckets from requests-per-window counts.
    #[must_use]
    pub fn new(auth_per_window: u32, general_per_window: u32) -> Self {
        Self {
            auth: RateLimiter::keyed(quota(auth_per_window)),
            general: RateLimiter::keyed(quota(general_per_window)),
        }
    }

    fn check(&self, is_auth: bool, key: &String) -> bool {
        let limiter = if is_auth { &self.auth } else { &self.general };
        limiter.check_key(key).is_ok()
    }
}

impl std::fmt::Debug for RateLimiters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiters").finish_non_exhaustive()
    }
}

/// `n` requests per 15-minute window, burstable up to the full budget.
fn quota(per_window: u32) -> Quota {
    let per_window = NonZeroU32::new(per_window.max(1)).expect("non-zero after max(1)");
    let replenish = WINDOW / per_window.get();
    Quota::with_period(replenish)
        .expect("non-zero period")
        .allow_burst(per_window)
}

/// Middleware applying the bucket matching the request path.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let key = address_from_parts(&parts).unwrap_or_else(|| "unknown".to_string());
    let is_auth = parts.uri.path().starts_with("/api/auth");

    if !state.rate.check(is_auth, &key) {
        warn!(client = %key, path = %parts.uri.path(), "rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }
    next.run(Request::from_parts(parts, body)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_saturates_at_the_window_budget() {
        let limiters = RateLimiters::new(3, 100);
        let key = "203.0.113.1".to_string();

        for _ in 0..3 {
            assert!(limiters.check(true, &key));
        }
        assert!(!limiters.check(true, &key));

        // The general bucket and other clients are unaffected.
        assert!(limiters.check(false, &key));
        assert!(limiters.check(true, &"203.0.113.2".to_string()));
    }
}
