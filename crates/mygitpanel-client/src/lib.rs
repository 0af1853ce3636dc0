//! Upstream GitHub client port: paginated reads, an ETag-aware caching
//! decorator, and the write operations the review/moderation flows need.
//!
//! [`client::UpstreamClient`] is the seam the rest of the workspace
//! depends on; [`octocrab_client::OctocrabClient`] and
//! [`cached_client::CachedGitHubClient`] are the two implementations
//! wired together at startup.

pub mod cache;
pub mod cached_client;
pub mod client;
pub mod octocrab_client;
pub mod rate_limit;
pub mod types;

pub use cache::{ApiCache, CachedResponse};
pub use cached_client::CachedGitHubClient;
pub use client::{CacheMode, UpstreamClient};
pub use octocrab_client::OctocrabClient;
pub use rate_limit::RateLimitTracker;
pub use types::{InlineComment, PrDetail, ReviewEvent, ReviewSubmission, ThreadResolutionMap};
