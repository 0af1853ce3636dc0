//! Types used at the [`crate::client::UpstreamClient`] boundary that
//! don't already live in `mygitpanel-core::models` — write-operation
//! payloads, and the PR-detail slice returned by the health-enrichment
//! detail fetch.

use std::collections::HashMap;

use mygitpanel_core::models::{DiffSide, MergeableStatus};
use serde::{Deserialize, Serialize};

/// The subset of PR attributes the detail endpoint contributes that the
/// open-list endpoint doesn't carry (spec §4.6 step 1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrDetail {
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub mergeable_status: MergeableStatus,
}

/// Root comment ID → resolved?, returned by `fetch_thread_resolution`.
pub type ThreadResolutionMap = HashMap<i64, bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewEvent {
    Approve,
    RequestChanges,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineComment {
    pub path: String,
    pub line: u32,
    pub side: DiffSide,
    pub body: String,
}

/// Payload for [`crate::client::UpstreamClient::submit_review`].
///
/// If `commit_id` is empty the implementation fetches the PR first to
/// obtain the current head SHA before submitting, per spec §4.9.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewSubmission {
    pub commit_id: Option<String>,
    pub event: Option<ReviewEvent>,
    pub body: Option<String>,
    pub comments: Vec<InlineComment>,
}

impl ReviewSubmission {
    pub fn new(event: ReviewEvent) -> Self {
        Self {
            commit_id: None,
            event: Some(event),
            body: None,
            comments: Vec::new(),
        }
    }
}
