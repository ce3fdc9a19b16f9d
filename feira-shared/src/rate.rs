use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Keyed request counter with expiring windows. In a multi-process
/// deployment this is backed by a shared store (Redis); the engine core
/// never calls it directly, only the HTTP boundary does.
#[async_trait]
pub trait RateCounter: Send + Sync {
    /// Increment the counter for `key`, returning the count within the
    /// current window and when the window resets.
    async fn incr(
        &self,
        key: &str,
        window_seconds: i64,
    ) -> Result<(i64, DateTime<Utc>), Box<dyn std::error::Error + Send + Sync>>;
}
