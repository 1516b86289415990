use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::policy::LimitClass;
use crate::rate_limit::RateStatus;

// Body of POST /v1/rate-limit/{class}
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CheckRequest {
    pub identifier: String,
}

// Quota view returned by the rate-limit endpoints
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct QuotaView {
    pub identifier: String,
    pub class: String,
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after_secs: Option<u64>,
}

impl QuotaView {
    pub fn new(identifier: &str, class: LimitClass, status: &RateStatus) -> Self {
        Self {
            identifier: identifier.to_string(),
            class: class.to_string(),
            allowed: status.allowed,
            limit: status.limit,
            remaining: status.remaining,
            reset_after_secs: status.reset_after.map(ceil_secs),
        }
    }
}

// Acknowledgement for an accepted form submission
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct FormReceipt {
    pub submission_id: Uuid,
    pub form: String,
    pub received_at: String,
}

// Whole seconds, rounded up so clients never retry too early
pub fn ceil_secs(d: std::time::Duration) -> u64 {
    if d.subsec_nanos() > 0 {
        d.as_secs() + 1
    } else {
        d.as_secs()
    }
}
