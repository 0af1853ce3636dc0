//! Rate-limit accounting for the upstream transport (spec §4.4 / §4.9
//! design notes: "rate-limit back-off belongs inside the client
//! transport; the scheduler treats it as ordinary latency").

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

/// Tracks the most recently observed `X-RateLimit-*` headers and logs a
/// warning once remaining quota drops below the threshold.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    remaining: AtomicU32,
    reset_at_epoch_secs: AtomicI64,
}

const LOW_QUOTA_WARNING_THRESHOLD: u32 = 100;

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            remaining: AtomicU32::new(u32::MAX),
            reset_at_epoch_secs: AtomicI64::new(0),
        }
    }

    /// Record quota observed on the most recent response and, if it has
    /// dropped below the warning threshold, log the reset delta.
    pub fn observe(&self, remaining: u32, reset_at_epoch_secs: i64) {
        self.remaining.store(remaining, Ordering::Relaxed);
        self.reset_at_epoch_secs
            .store(reset_at_epoch_secs, Ordering::Relaxed);

        if remaining < LOW_QUOTA_WARNING_THRESHOLD {
            let now = chrono::Utc::now().timestamp();
            let reset_in = (reset_at_epoch_secs - now).max(0);
            log::warn!(
                "GitHub API rate limit low: {} requests remaining, resets in {}s",
                remaining,
                reset_in
            );
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::Relaxed)
    }
}
