use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::core::types::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    Allowed,
    Denied { remaining: Duration },
}

/// Per-user admission timestamps.
///
/// Entries are never pruned; they simply stop mattering once older than the period.
#[derive(Debug)]
pub struct CooldownTracker {
    period: Duration,
    last_admission: HashMap<UserId, Instant>,
}

impl CooldownTracker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_admission: HashMap::new(),
        }
    }

    /// Deny if the last admission is younger than the period; otherwise stamp `now`.
    pub fn check_and_record(&mut self, user_id: UserId, now: Instant) -> CooldownDecision {
        if let Some(last) = self.last_admission.get(&user_id) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < self.period {
                return CooldownDecision::Denied {
                    remaining: self.period - elapsed,
                };
            }
        }
        self.last_admission.insert(user_id, now);
        CooldownDecision::Allowed
    }

    /// Drop a user's record so their next admission is not throttled.
    pub fn forget(&mut self, user_id: UserId) {
        self.last_admission.remove(&user_id);
    }
}
