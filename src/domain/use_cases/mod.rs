pub mod dedupe;
pub mod rate_limit;
pub mod submission;
