//! Adaptive poll scheduler, repo poll cycle, and review/health
//! enrichment (spec §4.2–§4.7).

pub mod health_enrichment;
pub mod poll_cycle;
pub mod refresh;
pub mod review_enrichment;
pub mod schedule;
pub mod scheduler;

pub use poll_cycle::{is_review_requested_from, poll_repo, PollCycleResult};
pub use refresh::{refresh_channel, RefreshOutcome, RefreshReceiver, RefreshRequest, RefreshSender};
pub use schedule::{classify_tier, ScheduleRecord, Tier};
pub use scheduler::PollScheduler;
