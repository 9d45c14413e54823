use std::sync::Arc;

use crate::{
    clock::Clock,
    entities::{
        checks::DuplicateCheck,
        records::{DedupeRecord, DedupeUpdate},
    },
    errors::StoreError,
    repositories::dedupe::DedupeRepository,
    settings::SubmissionPolicy,
};

/// Counts repeated fingerprints inside a sliding TTL.
pub struct DuplicateTracker<R>
where
    R: DedupeRepository,
{
    pub repo: R,
    clock: Arc<dyn Clock>,
    dedupe_ttl: u64,
    max_duplicate_count: u32,
}

impl<R> DuplicateTracker<R>
where
    R: DedupeRepository,
{
    pub fn new(repo: R, policy: &SubmissionPolicy, clock: Arc<dyn Clock>) -> Self {
        DuplicateTracker {
            repo,
            clock,
            dedupe_ttl: policy.dedupe_ttl,
            max_duplicate_count: policy.max_duplicate_count,
        }
    }

    /// Records a sighting of `hash`. Never fails: a store outage lets the
    /// submission through and is only logged.
    pub async fn check(&self, hash: &str) -> DuplicateCheck {
        self.try_check(hash).await.unwrap_or_else(|e| {
            tracing::error!(error = %e, hash, "Error checking duplicate, allowing submission");
            DuplicateCheck::fail_open()
        })
    }

    /// Records a sighting of `hash`, surfacing store failures.
    pub async fn try_check(&self, hash: &str) -> Result<DuplicateCheck, StoreError> {
        let now = self.clock.now();
        // Every sighting pushes the expiry forward.
        let expires_at = now.timestamp() + self.dedupe_ttl as i64;

        let Some(record) = self.repo.get_dedupe_record(hash).await? else {
            self.repo
                .put_dedupe_record(&DedupeRecord::first_sighting(hash, now, expires_at))
                .await?;
            return Ok(DuplicateCheck::first_sighting());
        };

        let count = record.count.saturating_add(1);
        let should_block = count > self.max_duplicate_count;

        self.repo
            .update_dedupe_record(
                hash,
                &DedupeUpdate {
                    count,
                    last_seen: now,
                    ttl: expires_at,
                },
            )
            .await?;

        Ok(DuplicateCheck {
            is_duplicate: true,
            count,
            should_block,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::repositories::dedupe::MockDedupeRepository;
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;

    fn policy() -> SubmissionPolicy {
        SubmissionPolicy {
            dedupe_ttl: 86400,
            max_duplicate_count: 3,
            rate_limit_window: 3600,
            rate_limit_max_requests: 10,
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()))
    }

    #[tokio::test]
    async fn first_sighting_creates_record() {
        let clock = clock();
        let now = clock.now();
        let mut repo = MockDedupeRepository::new();

        repo.expect_get_dedupe_record()
            .with(eq("abc"))
            .returning(|_| Ok(None));
        repo.expect_put_dedupe_record()
            .withf(move |record| {
                record.hash == "abc"
                    && record.count == 1
                    && record.ttl == now.timestamp() + 86400
                    && record.first_seen == now
                    && record.last_seen == now
            })
            .times(1)
            .returning(|_| Ok(()));
        repo.expect_update_dedupe_record().times(0);

        let tracker = DuplicateTracker::new(repo, &policy(), clock);

        assert_eq!(tracker.check("abc").await, DuplicateCheck::first_sighting());
    }

    #[tokio::test]
    async fn repeat_sighting_increments_and_slides_expiry() {
        let clock = clock();
        let now = clock.now();
        let mut repo = MockDedupeRepository::new();

        repo.expect_get_dedupe_record().returning(move |hash| {
            Ok(Some(DedupeRecord {
                hash: hash.to_string(),
                count: 2,
                ttl: now.timestamp() + 10,
                first_seen: now,
                last_seen: now,
            }))
        });
        repo.expect_update_dedupe_record()
            .withf(move |hash, update| {
                hash == "abc"
                    && update.count == 3
                    && update.last_seen == now
                    && update.ttl == now.timestamp() + 86400
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let tracker = DuplicateTracker::new(repo, &policy(), clock);

        assert_eq!(
            tracker.check("abc").await,
            DuplicateCheck { is_duplicate: true, count: 3, should_block: false }
        );
    }

    #[tokio::test]
    async fn blocks_once_count_exceeds_maximum() {
        let clock = clock();
        let now = clock.now();
        let mut repo = MockDedupeRepository::new();

        repo.expect_get_dedupe_record().returning(move |hash| {
            let mut record = DedupeRecord::first_sighting(hash, now, now.timestamp() + 60);
            record.count = 3;
            Ok(Some(record))
        });
        repo.expect_update_dedupe_record().returning(|_, _| Ok(()));

        let tracker = DuplicateTracker::new(repo, &policy(), clock);
        let check = tracker.check("abc").await;

        assert!(check.should_block);
        assert_eq!(check.count, 4);
    }

    #[tokio::test]
    async fn store_failure_on_read_fails_open() {
        let mut repo = MockDedupeRepository::new();
        repo.expect_get_dedupe_record()
            .returning(|_| Err(StoreError::Connection("connection refused".into())));
        repo.expect_put_dedupe_record().times(0);

        let tracker = DuplicateTracker::new(repo, &policy(), clock());

        assert_eq!(tracker.check("abc").await, DuplicateCheck::fail_open());
    }

    #[tokio::test]
    async fn store_failure_on_write_fails_open() {
        let mut repo = MockDedupeRepository::new();
        repo.expect_get_dedupe_record().returning(|_| Ok(None));
        repo.expect_put_dedupe_record()
            .returning(|_| Err(StoreError::Operation("READONLY".into())));

        let tracker = DuplicateTracker::new(repo, &policy(), clock());

        assert!(matches!(tracker.try_check("abc").await, Err(StoreError::Operation(_))));
        assert_eq!(tracker.check("abc").await, DuplicateCheck::fail_open());
    }
}
