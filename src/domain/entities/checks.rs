use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    pub count: u32,
    pub should_block: bool,
}

impl DuplicateCheck {
    pub fn first_sighting() -> Self {
        DuplicateCheck {
            is_duplicate: false,
            count: 1,
            should_block: false,
        }
    }

    /// Outcome used when the store cannot be consulted.
    pub fn fail_open() -> Self {
        DuplicateCheck {
            is_duplicate: false,
            count: 0,
            should_block: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitCheck {
    pub allowed: bool,
    pub remaining: u32,
    /// End of the current window, epoch milliseconds.
    pub reset_time: i64,
}
