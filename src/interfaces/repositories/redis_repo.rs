use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, Utc};
use deadpool_redis::Pool;
use once_cell::sync::Lazy;
use redis::{AsyncCommands, Script};

use crate::entities::records::{DedupeRecord, RateLimitRecord};
use crate::errors::StoreError;

const DEDUPE_PREFIX: &str = "dedupe";
const RATE_LIMIT_PREFIX: &str = "ratelimit";

// ARGV[1] is an optional EXPIREAT timestamp, the rest are field/value pairs.
// Missing keys are left missing so a racing expiry never leaves a partial record.
static UPDATE_EXISTING: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        if redis.call('EXISTS', KEYS[1]) == 0 then
            return 0
        end
        redis.call('HSET', KEYS[1], unpack(ARGV, 2))
        if ARGV[1] ~= '' then
            redis.call('EXPIREAT', KEYS[1], ARGV[1])
        end
        return 1
        "#,
    )
});

/// Records kept as Redis hashes. Redis owns physical expiry through `EXPIREAT`.
#[derive(Clone)]
pub struct RedisRecordStore {
    pub pool: Pool,
}

impl RedisRecordStore {
    pub fn new(pool: Pool) -> Self {
        RedisRecordStore { pool }
    }

    pub fn dedupe_key(hash: &str) -> String {
        format!("{DEDUPE_PREFIX}:{hash}")
    }

    /// IPv6 addresses contain `:`; encode to keep the key namespace flat.
    pub fn rate_limit_key(ip: &str) -> String {
        format!("{RATE_LIMIT_PREFIX}:{}", urlencoding::encode(ip))
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Operation(format!("Unexpected PING reply: {pong}")))
        }
    }

    pub(crate) async fn read_record<R: HashRecord>(&self, key: &str) -> Result<Option<R>, StoreError> {
        let mut conn = self.pool.get().await?;
        let fields: HashMap<String, String> = conn.hgetall(key).await?;

        if fields.is_empty() {
            return Ok(None);
        }
        R::from_fields(key, &fields).map(Some)
    }

    pub(crate) async fn write_record<R: HashRecord>(&self, key: &str, record: &R) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        let fields = record.to_fields();

        redis::pipe()
            .atomic()
            .del(key).ignore()
            .hset_multiple(key, &fields[..]).ignore()
            .expire_at(key, record.expires_at()).ignore()
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }

    pub(crate) async fn update_record(
        &self,
        key: &str,
        fields: &[(&'static str, String)],
        expire_at: Option<i64>,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;

        let mut invocation = UPDATE_EXISTING.key(key);
        invocation.arg(expire_at.map(|ts| ts.to_string()).unwrap_or_default());
        for (name, value) in fields {
            invocation.arg(*name).arg(value);
        }

        let updated: i32 = invocation.invoke_async(&mut conn).await?;
        if updated == 0 {
            tracing::debug!(key, "Record vanished before update, skipping");
        }
        Ok(())
    }
}

/// Flat string encoding of a record as a Redis hash.
pub(crate) trait HashRecord: Sized {
    fn to_fields(&self) -> Vec<(&'static str, String)>;
    fn from_fields(key: &str, fields: &HashMap<String, String>) -> Result<Self, StoreError>;
    fn expires_at(&self) -> i64;
}

impl HashRecord for DedupeRecord {
    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("hash", self.hash.clone()),
            ("count", self.count.to_string()),
            ("ttl", self.ttl.to_string()),
            ("firstSeen", self.first_seen.to_rfc3339()),
            ("lastSeen", self.last_seen.to_rfc3339()),
        ]
    }

    fn from_fields(key: &str, fields: &HashMap<String, String>) -> Result<Self, StoreError> {
        Ok(DedupeRecord {
            hash: field(key, fields, "hash")?.to_string(),
            count: parse_field(key, fields, "count")?,
            ttl: parse_field(key, fields, "ttl")?,
            first_seen: timestamp_field(key, fields, "firstSeen")?,
            last_seen: timestamp_field(key, fields, "lastSeen")?,
        })
    }

    fn expires_at(&self) -> i64 {
        self.ttl
    }
}

impl HashRecord for RateLimitRecord {
    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ip", self.ip.clone()),
            ("count", self.count.to_string()),
            ("ttl", self.ttl.to_string()),
            ("windowStart", self.window_start.to_rfc3339()),
        ]
    }

    fn from_fields(key: &str, fields: &HashMap<String, String>) -> Result<Self, StoreError> {
        Ok(RateLimitRecord {
            ip: field(key, fields, "ip")?.to_string(),
            count: parse_field(key, fields, "count")?,
            ttl: parse_field(key, fields, "ttl")?,
            window_start: timestamp_field(key, fields, "windowStart")?,
        })
    }

    fn expires_at(&self) -> i64 {
        self.ttl
    }
}

fn field<'a>(key: &str, fields: &'a HashMap<String, String>, name: &str) -> Result<&'a str, StoreError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| StoreError::Decode {
            key: key.to_string(),
            reason: format!("missing field {name}"),
        })
}

fn parse_field<T: FromStr>(key: &str, fields: &HashMap<String, String>, name: &str) -> Result<T, StoreError> {
    let raw = field(key, fields, name)?;
    raw.parse().map_err(|_| StoreError::Decode {
        key: key.to_string(),
        reason: format!("field {name} has invalid value {raw:?}"),
    })
}

fn timestamp_field(key: &str, fields: &HashMap<String, String>, name: &str) -> Result<DateTime<Utc>, StoreError> {
    let raw = field(key, fields, name)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode {
            key: key.to_string(),
            reason: format!("field {name} is not a timestamp: {e}"),
        })
}
