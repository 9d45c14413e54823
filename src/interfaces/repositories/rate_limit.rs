use async_trait::async_trait;

use crate::entities::records::{RateLimitRecord, RateLimitUpdate};
use crate::errors::StoreError;
use crate::repositories::{
    memory_repo::{live, MemoryRecordStore},
    redis_repo::RedisRecordStore,
    store::RecordStore,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    async fn get_rate_limit_record(&self, ip: &str) -> Result<Option<RateLimitRecord>, StoreError>;

    /// Creates or overwrites the window record; it expires at `record.ttl`.
    async fn put_rate_limit_record(&self, record: &RateLimitRecord) -> Result<(), StoreError>;

    /// Rewrites the count of an existing record, keeping its expiry.
    async fn update_rate_limit_record(&self, ip: &str, update: &RateLimitUpdate) -> Result<(), StoreError>;
}

#[async_trait]
impl RateLimitRepository for RedisRecordStore {
    async fn get_rate_limit_record(&self, ip: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        self.read_record(&Self::rate_limit_key(ip)).await
    }

    async fn put_rate_limit_record(&self, record: &RateLimitRecord) -> Result<(), StoreError> {
        self.write_record(&Self::rate_limit_key(&record.ip), record).await
    }

    async fn update_rate_limit_record(&self, ip: &str, update: &RateLimitUpdate) -> Result<(), StoreError> {
        let fields = [("count", update.count.to_string())];
        self.update_record(&Self::rate_limit_key(ip), &fields, None).await
    }
}

#[async_trait]
impl RateLimitRepository for MemoryRecordStore {
    async fn get_rate_limit_record(&self, ip: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        Ok(live(&self.rate_limits, ip, self.now_secs(), |r| r.ttl))
    }

    async fn put_rate_limit_record(&self, record: &RateLimitRecord) -> Result<(), StoreError> {
        self.rate_limits.insert(record.ip.clone(), record.clone());
        Ok(())
    }

    async fn update_rate_limit_record(&self, ip: &str, update: &RateLimitUpdate) -> Result<(), StoreError> {
        let now = self.now_secs();
        if let Some(mut record) = self.rate_limits.get_mut(ip) {
            if record.ttl > now {
                record.apply(update);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RateLimitRepository for RecordStore {
    async fn get_rate_limit_record(&self, ip: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        match self {
            RecordStore::Redis(store) => store.get_rate_limit_record(ip).await,
            RecordStore::Memory(store) => store.get_rate_limit_record(ip).await,
        }
    }

    async fn put_rate_limit_record(&self, record: &RateLimitRecord) -> Result<(), StoreError> {
        match self {
            RecordStore::Redis(store) => store.put_rate_limit_record(record).await,
            RecordStore::Memory(store) => store.put_rate_limit_record(record).await,
        }
    }

    async fn update_rate_limit_record(&self, ip: &str, update: &RateLimitUpdate) -> Result<(), StoreError> {
        match self {
            RecordStore::Redis(store) => store.update_rate_limit_record(ip, update).await,
            RecordStore::Memory(store) => store.update_rate_limit_record(ip, update).await,
        }
    }
}
