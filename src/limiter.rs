// src/limiter.rs

//! Best-effort fixed-window rate limiting.
//!
//! Buckets are keyed by (caller, action, window index) and incremented
//! inside a single store transaction, so concurrent invocations cannot both
//! slip under the limit. Counters are strictly additive within a window and
//! expire two windows later. Bursts at window boundaries are accepted.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::store::{paths, DocumentStore};

/// One day in milliseconds.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// One minute in milliseconds.
pub const MINUTE_MS: i64 = 60 * 1000;

/// Transactional fixed-window rate limiter.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn DocumentStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Consume one unit of `action` quota for `uid`, or fail with
    /// `ResourceExhausted` when the current window is already full.
    pub async fn try_consume(
        &self,
        uid: &str,
        action: &str,
        max_requests: u32,
        window_ms: i64,
    ) -> Result<()> {
        self.try_consume_at(Utc::now().timestamp_millis(), uid, action, max_requests, window_ms)
            .await
    }

    /// Clock-explicit variant of [`try_consume`](Self::try_consume).
    pub async fn try_consume_at(
        &self,
        now_ms: i64,
        uid: &str,
        action: &str,
        max_requests: u32,
        window_ms: i64,
    ) -> Result<()> {
        let window = now_ms.div_euclid(window_ms);
        let path = paths::rate_bucket(uid, action, window);

        let uid = uid.to_string();
        let action = action.to_string();
        self.store
            .transact(
                &path,
                Box::new(move |current| {
                    let count = current
                        .and_then(|doc| doc.get("count"))
                        .and_then(|count| count.as_u64())
                        .unwrap_or(0);
                    if count >= u64::from(max_requests) {
                        return Err(AppError::resource_exhausted(
                            "Rate limit exceeded. Please try again later.",
                        ));
                    }
                    Ok(json!({
                        "uid": uid,
                        "key": action,
                        "window": window,
                        "count": count + 1,
                        "updatedAtMs": now_ms,
                        "expiresAtMs": now_ms + window_ms * 2,
                    }))
                }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_allows_up_to_max_then_denies() {
        let limiter = limiter();
        for _ in 0..3 {
            limiter
                .try_consume_at(1_000, "u1", "chat_minute", 3, MINUTE_MS)
                .await
                .unwrap();
        }

        let denied = limiter
            .try_consume_at(1_000, "u1", "chat_minute", 3, MINUTE_MS)
            .await;
        assert!(matches!(denied, Err(AppError::ResourceExhausted(_))));
    }

    #[tokio::test]
    async fn test_next_window_admits_again() {
        let limiter = limiter();
        limiter
            .try_consume_at(0, "u1", "quiz", 1, MINUTE_MS)
            .await
            .unwrap();
        assert!(limiter
            .try_consume_at(MINUTE_MS - 1, "u1", "quiz", 1, MINUTE_MS)
            .await
            .is_err());

        // First millisecond of the following window
        limiter
            .try_consume_at(MINUTE_MS, "u1", "quiz", 1, MINUTE_MS)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_actions_and_callers_are_independent() {
        let limiter = limiter();
        limiter
            .try_consume_at(5, "u1", "a", 1, MINUTE_MS)
            .await
            .unwrap();
        limiter
            .try_consume_at(5, "u1", "b", 1, MINUTE_MS)
            .await
            .unwrap();
        limiter
            .try_consume_at(5, "u2", "a", 1, MINUTE_MS)
            .await
            .unwrap();
        assert!(limiter.try_consume_at(5, "u1", "a", 1, MINUTE_MS).await.is_err());
    }

    #[tokio::test]
    async fn test_bucket_carries_expiry() {
        let store = Arc::new(MemoryStore::new());
        let limiter = RateLimiter::new(store.clone());
        limiter
            .try_consume_at(10_000, "u1", "a", 5, MINUTE_MS)
            .await
            .unwrap();

        let window = 10_000 / MINUTE_MS;
        let bucket = store
            .get(&paths::rate_bucket("u1", "a", window))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bucket["count"], 1);
        assert_eq!(bucket["expiresAtMs"], 10_000 + MINUTE_MS * 2);
    }
}
