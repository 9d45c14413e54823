use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How often a fingerprint has been seen inside its sliding TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupeRecord {
    pub hash: String,
    pub count: u32,
    /// Expiry, epoch seconds. Advisory to the store.
    pub ttl: i64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl DedupeRecord {
    pub fn first_sighting(hash: &str, now: DateTime<Utc>, ttl: i64) -> Self {
        DedupeRecord {
            hash: hash.to_string(),
            count: 1,
            ttl,
            first_seen: now,
            last_seen: now,
        }
    }

    pub fn apply(&mut self, update: &DedupeUpdate) {
        self.count = update.count;
        self.last_seen = update.last_seen;
        self.ttl = update.ttl;
    }
}

/// Fields rewritten on every repeated sighting.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupeUpdate {
    pub count: u32,
    pub last_seen: DateTime<Utc>,
    pub ttl: i64,
}

/// Request count of one client address inside one fixed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    pub ip: String,
    pub count: u32,
    /// Expiry, epoch seconds; the end of the window.
    pub ttl: i64,
    pub window_start: DateTime<Utc>,
}

impl RateLimitRecord {
    pub fn opening(ip: &str, window_start: DateTime<Utc>, ttl: i64) -> Self {
        RateLimitRecord {
            ip: ip.to_string(),
            count: 1,
            ttl,
            window_start,
        }
    }

    pub fn apply(&mut self, update: &RateLimitUpdate) {
        self.count = update.count;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitUpdate {
    pub count: u32,
}
