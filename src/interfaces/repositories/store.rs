use crate::errors::StoreError;
use crate::repositories::{memory_repo::MemoryRecordStore, redis_repo::RedisRecordStore};

/// The store handle chosen at startup and shared by both trackers.
#[derive(Clone)]
pub enum RecordStore {
    Redis(RedisRecordStore),
    Memory(MemoryRecordStore),
}

impl RecordStore {
    pub fn kind(&self) -> &'static str {
        match self {
            RecordStore::Redis(_) => "redis",
            RecordStore::Memory(_) => "memory",
        }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        match self {
            RecordStore::Redis(store) => store.ping().await,
            RecordStore::Memory(_) => Ok(()),
        }
    }
}

impl From<RedisRecordStore> for RecordStore {
    fn from(store: RedisRecordStore) -> Self {
        RecordStore::Redis(store)
    }
}

impl From<MemoryRecordStore> for RecordStore {
    fn from(store: MemoryRecordStore) -> Self {
        RecordStore::Memory(store)
    }
}
