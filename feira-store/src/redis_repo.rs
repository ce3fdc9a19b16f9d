use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use feira_shared::rate::RateCounter;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RateCounter for RedisClient {
    async fn incr(
        &self,
        key: &str,
        window_seconds: i64,
    ) -> Result<(i64, DateTime<Utc>), Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // EXPIRE on every INCR keeps the window sliding from the last hit;
        // good enough for abuse throttling.
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok((count, Utc::now() + Duration::seconds(window_seconds)))
    }
}
