use deadpool_redis::{Config, Pool, Runtime};
use tracing::info;
use std::time::Duration;

use crate::errors::StoreError;
use crate::repositories::redis_repo::RedisRecordStore;

/// Builds a connection pool and waits until Redis answers a PING.
pub async fn create_pool(redis_url: &str) -> Result<Pool, StoreError> {
    let max_retries = 5;
    let mut retry_count = 0;
    let mut wait_seconds = 2;

    let pool = Config::from_url(redis_url).create_pool(Some(Runtime::Tokio1))?;
    let store = RedisRecordStore::new(pool.clone());

    loop {
        match store.ping().await {
            Ok(()) => {
                info!("Redis connection established.");
                return Ok(pool);
            }
            Err(e) if retry_count < max_retries => {
                retry_count += 1;
                info!(
                    "Failed to reach Redis (attempt {}/{}): {}. Retrying in {}s...",
                    retry_count, max_retries, e, wait_seconds);

                tokio::time::sleep(Duration::from_secs(wait_seconds)).await;

                wait_seconds *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}
