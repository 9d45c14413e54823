use tokio::time::{interval, Duration};

use crate::{constants::PURGE_INTERVAL_SECS, repositories::memory_repo::MemoryRecordStore};

/// Sweeps expired records out of the in-memory store. Redis expires its own keys.
pub async fn start_purge_task(store: MemoryRecordStore) {
    let mut interval = interval(Duration::from_secs(PURGE_INTERVAL_SECS));

    loop {
        interval.tick().await;

        let purged = store.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, remaining = store.len(), "Purged expired records");
        }
    }
}
