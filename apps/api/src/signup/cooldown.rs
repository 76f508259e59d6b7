use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RESEND_COOLDOWN_SECS: u32 = 120;

/// Countdown gating a rate-limited action such as resending the verification email.
///
/// The remaining time drops by one for every whole second elapsed since the
/// last restart, independent of any network activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cooldown {
    pub duration_secs: u32,
    pub started_at: Option<DateTime<Utc>>,
}

impl Cooldown {
    pub fn started(duration_secs: u32, now: DateTime<Utc>) -> Self {
        Self {
            duration_secs,
            started_at: Some(now),
        }
    }

    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u32 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        let elapsed = (now - started_at).num_seconds().max(0);
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.duration_secs.saturating_sub(elapsed)
    }

    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs(now) == 0
    }

    pub fn restart(&mut self, now: DateTime<Utc>) {
        self.started_at = Some(now);
    }
}
