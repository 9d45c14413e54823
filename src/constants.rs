use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

pub static START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Upper bound for a submission body.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// How often expired records are swept from the in-memory store.
pub const PURGE_INTERVAL_SECS: u64 = 60;
