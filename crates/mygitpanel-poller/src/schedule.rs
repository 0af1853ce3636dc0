//! Adaptive poll tiers (spec §4.2): classify a repo by its freshest
//! activity and derive the delay until its next scheduled poll.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Hot,
    Active,
    Warm,
    Stale,
}

impl Tier {
    pub fn delay(self) -> Duration {
        match self {
            Tier::Hot => Duration::minutes(2),
            Tier::Active => Duration::minutes(5),
            Tier::Warm => Duration::minutes(15),
            Tier::Stale => Duration::minutes(30),
        }
    }
}

/// `freshest_activity` is the latest `last_activity_at` across a repo's
/// stored PRs; `None` (no PRs) classifies as stale.
pub fn classify_tier(freshest_activity: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Tier {
    let Some(activity) = freshest_activity else {
        return Tier::Stale;
    };
    let age = now - activity;
    if age < Duration::hours(1) {
        Tier::Hot
    } else if age < Duration::hours(24) {
        Tier::Active
    } else if age < Duration::days(7) {
        Tier::Warm
    } else {
        Tier::Stale
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleRecord {
    pub repo_full_name: String,
    pub tier: Tier,
    pub next_poll_at: DateTime<Utc>,
    pub last_polled: Option<DateTime<Utc>>,
}

impl ScheduleRecord {
    pub fn new(repo_full_name: String, now: DateTime<Utc>) -> Self {
        Self {
            repo_full_name,
            tier: Tier::Stale,
            next_poll_at: now,
            last_polled: None,
        }
    }

    pub fn reclassify(&mut self, freshest_activity: Option<DateTime<Utc>>, now: DateTime<Utc>) {
        self.tier = classify_tier(freshest_activity, now);
        self.last_polled = Some(now);
        self.next_poll_at = now + self.tier.delay();
    }
}
