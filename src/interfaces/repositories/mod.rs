pub mod dedupe;
pub mod memory_repo;
pub mod rate_limit;
pub mod redis_repo;
pub mod store;
