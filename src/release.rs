use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::AcademicSession;

/// Time left before results open, split for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Countdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Countdown {
    pub fn from_seconds(total: u64) -> Self {
        Countdown {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Countdown::default()
    }
}

pub fn is_released(session: &AcademicSession, now: DateTime<Utc>) -> bool {
    if session.results_unlocked {
        return true;
    }

    match session.result_release_date {
        None => true,
        Some(release_at) => now >= release_at,
    }
}

/// `None` when results are already visible or no release date is set.
pub fn time_remaining(session: &AcademicSession, now: DateTime<Utc>) -> Option<Countdown> {
    if is_released(session, now) {
        return None;
    }

    let release_at = session.result_release_date?;
    let remaining = (release_at - now).num_seconds().max(0);
    Some(Countdown::from_seconds(remaining.unsigned_abs()))
}
