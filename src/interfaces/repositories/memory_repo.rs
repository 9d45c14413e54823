use std::sync::Arc;

use dashmap::DashMap;

use crate::clock::Clock;
use crate::entities::records::{DedupeRecord, RateLimitRecord};

/// In-process record store for single-instance deployments and tests.
///
/// Reads treat records whose `ttl` has passed as absent; physical removal
/// happens in [`MemoryRecordStore::purge_expired`], driven by the background
/// purge task.
#[derive(Clone)]
pub struct MemoryRecordStore {
    pub(crate) dedupe: Arc<DashMap<String, DedupeRecord>>,
    pub(crate) rate_limits: Arc<DashMap<String, RateLimitRecord>>,
    clock: Arc<dyn Clock>,
}

impl MemoryRecordStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryRecordStore {
            dedupe: Arc::new(DashMap::new()),
            rate_limits: Arc::new(DashMap::new()),
            clock,
        }
    }

    pub(crate) fn now_secs(&self) -> i64 {
        self.clock.now().timestamp()
    }

    /// Removes every expired record and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.now_secs();
        purge(&self.dedupe, now, |r| r.ttl) + purge(&self.rate_limits, now, |r| r.ttl)
    }

    /// Number of physically stored records, expired or not.
    pub fn len(&self) -> usize {
        self.dedupe.len() + self.rate_limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn live<V: Clone>(
    map: &DashMap<String, V>,
    key: &str,
    now: i64,
    ttl: impl Fn(&V) -> i64,
) -> Option<V> {
    // The read guard must be released before touching the shard again.
    let expired = match map.get(key) {
        Some(entry) if ttl(entry.value()) > now => return Some(entry.value().clone()),
        Some(_) => true,
        None => false,
    };

    if expired {
        map.remove_if(key, |_, value| ttl(value) <= now);
    }
    None
}

fn purge<V>(map: &DashMap<String, V>, now: i64, ttl: impl Fn(&V) -> i64) -> usize {
    let before = map.len();
    map.retain(|_, value| ttl(value) > now);
    before.saturating_sub(map.len())
}
