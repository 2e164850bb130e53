/// Rate limiting for the login endpoint
///
/// Implements a token-bucket limiter held in process memory, keyed by client
/// address. Login is the only brute-forceable public endpoint, so it is the
/// only one limited; everything else sits behind authentication.
///
/// # Algorithm
///
/// Token bucket per client key:
/// - tokens refill at a constant rate up to the bucket capacity
/// - each request consumes 1 token
/// - a request with an empty bucket is rejected with 429 and `Retry-After`
///
/// # Limits
///
/// 10 requests/minute with a burst capacity of 10.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Requests allowed per minute per client
const LOGIN_REQUESTS_PER_MINUTE: u32 = 10;

/// Token bucket state for one client
#[derive(Debug, Clone)]
struct TokenBucket {
    /// Current number of tokens
    tokens: f64,

    /// Last refill timestamp (Unix seconds)
    last_refill: u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl TokenBucket {
    fn new(capacity: u32) -> Self {
        Self {
            tokens: capacity as f64,
            last_refill: unix_now(),
        }
    }

    /// Refills tokens based on elapsed time, capped at capacity
    fn refill(&mut self, rate: f64, capacity: u32) {
        let now = unix_now();
        let elapsed_secs = now.saturating_sub(self.last_refill) as f64;

        self.tokens = (self.tokens + elapsed_secs * rate).min(capacity as f64);
        self.last_refill = now;
    }

    /// Attempts to consume one token
    fn try_consume(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Seconds until one token is available
    fn seconds_until_available(&self, rate: f64) -> u64 {
        let deficit = 1.0 - self.tokens;
        if deficit <= 0.0 {
            0
        } else {
            (deficit / rate).ceil() as u64
        }
    }
}

/// In-process rate limiter, one bucket per client key
#[derive(Debug)]
pub struct LoginRateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    capacity: u32,
    refill_rate: f64,
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(LOGIN_REQUESTS_PER_MINUTE)
    }
}

impl LoginRateLimiter {
    /// Creates a limiter allowing `requests_per_minute` with equal burst
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity: requests_per_minute,
            refill_rate: requests_per_minute as f64 / 60.0,
        }
    }

    /// Checks and consumes a token for `key`
    ///
    /// Returns `Err(retry_after_seconds)` when the bucket is empty.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());

        // Full buckets carry no state worth keeping
        if buckets.len() > 1024 {
            let capacity = self.capacity as f64;
            buckets.retain(|_, b| b.tokens < capacity);
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.capacity));

        bucket.refill(self.refill_rate, self.capacity);

        if bucket.try_consume() {
            Ok(())
        } else {
            Err(bucket.seconds_until_available(self.refill_rate))
        }
    }
}

/// Derives the limiter key for a request
///
/// Prefers the first `X-Forwarded-For` entry (reverse-proxy deployments),
/// falling back to the peer address.
fn client_key(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }

    peer.map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Login rate-limiting middleware
///
/// Rejects with 429 (and `Retry-After`) once the client's bucket is empty.
pub async fn login_rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(
        request.headers(),
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
    );

    match state.login_limiter.check(&key) {
        Ok(()) => Ok(next.run(request).await),
        Err(retry_after) => {
            tracing::warn!(client = %key, retry_after, "Login rate limit exceeded");
            Err(ApiError::RateLimitExceeded {
                retry_after,
                message: format!(
                    "Too many login attempts. Try again in {} seconds",
                    retry_after
                ),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_consume() {
        let mut bucket = TokenBucket::new(3);
        assert!(bucket.try_consume());
        assert!(bucket.try_consume());
        assert!(bucket.try_consume());
        assert!(!bucket.try_consume());
    }

    #[test]
    fn test_bucket_refill_capped() {
        let mut bucket = TokenBucket {
            tokens: 8.0,
            last_refill: unix_now() - 60,
        };

        bucket.refill(1.0, 10);
        assert_eq!(bucket.tokens, 10.0);
    }

    #[test]
    fn test_bucket_seconds_until_available() {
        let bucket = TokenBucket {
            tokens: 0.0,
            last_refill: unix_now(),
        };

        // 1 token at 0.5 tokens/sec -> 2 seconds
        assert_eq!(bucket.seconds_until_available(0.5), 2);

        let full = TokenBucket::new(1);
        assert_eq!(full.seconds_until_available(0.5), 0);
    }

    #[test]
    fn test_limiter_exhausts_and_reports_retry() {
        let limiter = LoginRateLimiter::new(2);

        assert!(limiter.check("1.2.3.4").is_ok());
        assert!(limiter.check("1.2.3.4").is_ok());

        let retry = limiter.check("1.2.3.4").unwrap_err();
        assert!(retry > 0);

        // Other clients are unaffected
        assert!(limiter.check("5.6.7.8").is_ok());
    }

    #[test]
    fn test_client_key_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());

        assert_eq!(client_key(&headers, None), "203.0.113.9");
        assert_eq!(client_key(&HeaderMap::new(), None), "unknown");
    }
}
