use async_trait::async_trait;

use crate::entities::records::{DedupeRecord, DedupeUpdate};
use crate::errors::StoreError;
use crate::repositories::{
    memory_repo::{live, MemoryRecordStore},
    redis_repo::RedisRecordStore,
    store::RecordStore,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DedupeRepository: Send + Sync {
    /// Fetches the live record for a fingerprint.
    async fn get_dedupe_record(&self, hash: &str) -> Result<Option<DedupeRecord>, StoreError>;

    /// Creates or overwrites a record; it expires at `record.ttl`.
    async fn put_dedupe_record(&self, record: &DedupeRecord) -> Result<(), StoreError>;

    /// Rewrites count, last-seen and expiry of an existing record.
    async fn update_dedupe_record(&self, hash: &str, update: &DedupeUpdate) -> Result<(), StoreError>;
}

#[async_trait]
impl DedupeRepository for RedisRecordStore {
    async fn get_dedupe_record(&self, hash: &str) -> Result<Option<DedupeRecord>, StoreError> {
        self.read_record(&Self::dedupe_key(hash)).await
    }

    async fn put_dedupe_record(&self, record: &DedupeRecord) -> Result<(), StoreError> {
        self.write_record(&Self::dedupe_key(&record.hash), record).await
    }

    async fn update_dedupe_record(&self, hash: &str, update: &DedupeUpdate) -> Result<(), StoreError> {
        let fields = [
            ("count", update.count.to_string()),
            ("lastSeen", update.last_seen.to_rfc3339()),
            ("ttl", update.ttl.to_string()),
        ];
        self.update_record(&Self::dedupe_key(hash), &fields, Some(update.ttl)).await
    }
}

#[async_trait]
impl DedupeRepository for MemoryRecordStore {
    async fn get_dedupe_record(&self, hash: &str) -> Result<Option<DedupeRecord>, StoreError> {
        Ok(live(&self.dedupe, hash, self.now_secs(), |r| r.ttl))
    }

    async fn put_dedupe_record(&self, record: &DedupeRecord) -> Result<(), StoreError> {
        self.dedupe.insert(record.hash.clone(), record.clone());
        Ok(())
    }

    async fn update_dedupe_record(&self, hash: &str, update: &DedupeUpdate) -> Result<(), StoreError> {
        let now = self.now_secs();
        if let Some(mut record) = self.dedupe.get_mut(hash) {
            if record.ttl > now {
                record.apply(update);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DedupeRepository for RecordStore {
    async fn get_dedupe_record(&self, hash: &str) -> Result<Option<DedupeRecord>, StoreError> {
        match self {
            RecordStore::Redis(store) => store.get_dedupe_record(hash).await,
            RecordStore::Memory(store) => store.get_dedupe_record(hash).await,
        }
    }

    async fn put_dedupe_record(&self, record: &DedupeRecord) -> Result<(), StoreError> {
        match self {
            RecordStore::Redis(store) => store.put_dedupe_record(record).await,
            RecordStore::Memory(store) => store.put_dedupe_record(record).await,
        }
    }

    async fn update_dedupe_record(&self, hash: &str, update: &DedupeUpdate) -> Result<(), StoreError> {
        match self {
            RecordStore::Redis(store) => store.update_dedupe_record(hash, update).await,
            RecordStore::Memory(store) => store.update_dedupe_record(hash, update).await,
        }
    }
}
