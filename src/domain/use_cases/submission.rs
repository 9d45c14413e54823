use std::sync::Arc;

use serde_json::Value;

use crate::{
    clock::Clock,
    email::Mailer,
    entities::submission::{ClientInfo, FormSubmission, ProcessedSubmission, SubmissionReceipt},
    errors::{AppError, FieldError},
    fingerprint::generate_submission_hash,
    normalize::normalize_submission,
    repositories::{dedupe::DedupeRepository, rate_limit::RateLimitRepository},
    settings::SubmissionPolicy,
    use_cases::{dedupe::DuplicateTracker, rate_limit::RateLimiter},
    validation::validate_submission,
};

const SUBMISSION_ID_LEN: usize = 8;

pub struct SubmissionHandler<R>
where
    R: DedupeRepository + RateLimitRepository + Clone,
{
    pub duplicates: DuplicateTracker<R>,
    pub rate_limiter: RateLimiter<R>,
    mailer: Mailer,
    clock: Arc<dyn Clock>,
    policy: SubmissionPolicy,
}

impl<R> SubmissionHandler<R>
where
    R: DedupeRepository + RateLimitRepository + Clone,
{
    pub fn new(store: R, policy: SubmissionPolicy, mailer: Mailer, clock: Arc<dyn Clock>) -> Self {
        SubmissionHandler {
            duplicates: DuplicateTracker::new(store.clone(), &policy, clock.clone()),
            rate_limiter: RateLimiter::new(store, &policy, clock.clone()),
            mailer,
            clock,
            policy,
        }
    }

    /// Runs one decoded request body through validation, the duplicate and
    /// rate checks, and notification.
    pub async fn process(
        &self,
        raw: &Value,
        client: &ClientInfo,
    ) -> Result<SubmissionReceipt, AppError> {
        let report = validate_submission(raw);
        if !report.valid {
            tracing::warn!(ip = %client.ip, errors = ?report.errors, "Validation failed");
            return Err(AppError::ValidationError(report.errors));
        }

        let submission = FormSubmission::from_json(raw)
            .ok_or_else(|| AppError::ValidationError(vec![FieldError::root("must be object")]))?;
        let normalized = normalize_submission(&submission);
        let hash = generate_submission_hash(&normalized);

        let duplicate = self.duplicates.check(&hash).await;
        if duplicate.should_block {
            tracing::warn!(hash = %hash, count = duplicate.count, "Duplicate submission blocked");
            return Err(AppError::DuplicateSubmission {
                retry_after: self.policy.dedupe_ttl,
            });
        }

        let rate = self.rate_limiter.check(&client.ip).await;
        if !rate.allowed {
            let now_ms = self.clock.now().timestamp_millis();
            let retry_after = ((rate.reset_time - now_ms).max(0) as u64).div_ceil(1000);
            tracing::warn!(ip = %client.ip, retry_after, "Rate limit exceeded");
            return Err(AppError::RateLimited { retry_after });
        }

        let processed = ProcessedSubmission {
            normalized,
            hash,
            timestamp: self.clock.now(),
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
        };

        self.mailer.notify(&processed).await?;

        let submission_id: String = processed.hash.chars().take(SUBMISSION_ID_LEN).collect();

        tracing::info!(
            submission_id = %submission_id,
            ip = %processed.ip,
            duplicate = duplicate.is_duplicate,
            remaining = rate.remaining,
            "Form submission processed"
        );

        Ok(SubmissionReceipt {
            success: true,
            message: "Form submitted successfully".to_string(),
            submission_id,
        })
    }
}
