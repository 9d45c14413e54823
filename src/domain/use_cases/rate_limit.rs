use std::sync::Arc;

use chrono::Duration;

use crate::{
    clock::Clock,
    entities::{
        checks::RateLimitCheck,
        records::{RateLimitRecord, RateLimitUpdate},
    },
    errors::StoreError,
    repositories::rate_limit::RateLimitRepository,
    settings::SubmissionPolicy,
};

/// Fixed-window request counter per client address. Windows are aligned to
/// the Unix epoch, so every client shares the same boundaries.
pub struct RateLimiter<R>
where
    R: RateLimitRepository,
{
    pub repo: R,
    clock: Arc<dyn Clock>,
    window_secs: u64,
    max_requests: u32,
}

impl<R> RateLimiter<R>
where
    R: RateLimitRepository,
{
    pub fn new(repo: R, policy: &SubmissionPolicy, clock: Arc<dyn Clock>) -> Self {
        RateLimiter {
            repo,
            clock,
            window_secs: policy.rate_limit_window,
            max_requests: policy.rate_limit_max_requests,
        }
    }

    fn window_ms(&self) -> i64 {
        (self.window_secs as i64).max(1) * 1000
    }

    /// Counts a request from `ip`. Never fails: a store outage allows the
    /// request with a full quota and is only logged.
    pub async fn check(&self, ip: &str) -> RateLimitCheck {
        let started = self.clock.now();

        self.try_check(ip).await.unwrap_or_else(|e| {
            tracing::error!(error = %e, ip, "Error checking rate limit, allowing request");
            RateLimitCheck {
                allowed: true,
                remaining: self.max_requests,
                reset_time: started.timestamp_millis() + self.window_ms(),
            }
        })
    }

    /// Counts a request from `ip`, surfacing store failures.
    pub async fn try_check(&self, ip: &str) -> Result<RateLimitCheck, StoreError> {
        let now = self.clock.now();
        let window = self.window_ms();
        let now_ms = now.timestamp_millis();
        let window_start_ms = now_ms.div_euclid(window) * window;
        let window_end_ms = window_start_ms + window;
        let window_start = now - Duration::milliseconds(now_ms - window_start_ms);

        let opened = RateLimitCheck {
            allowed: true,
            remaining: self.max_requests.saturating_sub(1),
            reset_time: window_end_ms,
        };
        let fresh = RateLimitRecord::opening(ip, window_start, window_end_ms.div_euclid(1000));

        let record = match self.repo.get_rate_limit_record(ip).await? {
            None => {
                self.repo.put_rate_limit_record(&fresh).await?;
                return Ok(opened);
            }
            Some(record) if record.window_start.timestamp_millis() < window_start_ms => {
                tracing::debug!(ip, previous_count = record.count, "Rate limit window rolled over");
                self.repo.put_rate_limit_record(&fresh).await?;
                return Ok(opened);
            }
            Some(record) => record,
        };

        let count = record.count.saturating_add(1);
        let allowed = count <= self.max_requests;

        // Past the limit the stored count is left alone, so a burst cannot
        // grow it without bound.
        if allowed {
            self.repo
                .update_rate_limit_record(ip, &RateLimitUpdate { count })
                .await?;
        }

        Ok(RateLimitCheck {
            allowed,
            remaining: self.max_requests.saturating_sub(count),
            reset_time: window_end_ms,
        })
    }
}
