//! The process-wide client provider cell (spec §4.1).
//!
//! Holds the current upstream client plus its authenticated username so
//! the scheduler and the HTTP handlers always observe a consistent pair —
//! never a client from one credential update paired with the username
//! from another.

use std::sync::Arc;

use mygitpanel_client::UpstreamClient;
use tokio::sync::RwLock;

struct Slot {
    client: Option<Arc<dyn UpstreamClient>>,
    username: Option<String>,
}

/// `Get` takes the reader lock, `Replace` takes the writer lock — `tokio`'s
/// `RwLock` guarantees `Replace` can't interleave with a `Get` and leave a
/// caller holding half-old, half-new state.
pub struct ClientProvider {
    slot: RwLock<Slot>,
}

impl ClientProvider {
    /// Starts empty: no client configured means "polling disabled, writes
    /// fail with credentials not configured" (spec §4.1).
    pub fn empty() -> Self {
        Self {
            slot: RwLock::new(Slot {
                client: None,
                username: None,
            }),
        }
    }

    pub fn with_client(client: Arc<dyn UpstreamClient>, username: String) -> Self {
        Self {
            slot: RwLock::new(Slot {
                client: Some(client),
                username: Some(username),
            }),
        }
    }

    /// Non-blocking from the caller's perspective (shared lock): returns
    /// the current client and username together, or `(None, None)`.
    pub async fn get(&self) -> (Option<Arc<dyn UpstreamClient>>, Option<String>) {
        let slot = self.slot.read().await;
        (slot.client.clone(), slot.username.clone())
    }

    /// Atomically swaps both fields. Used when the operator updates
    /// credentials through the UI.
    pub async fn replace(&self, client: Option<Arc<dyn UpstreamClient>>, username: Option<String>) {
        let mut slot = self.slot.write().await;
        slot.client = client;
        slot.username = username;
    }

    pub async fn has_client(&self) -> bool {
        self.slot.read().await.client.is_some()
    }
}

impl Default for ClientProvider {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mygitpanel_client::{PrDetail, ReviewSubmission, ThreadResolutionMap};
    use mygitpanel_core::models::{CheckRun, CiStatus, IssueComment, PullRequest, Review, ReviewComment};

    struct NoopClient;

    #[async_trait]
    impl UpstreamClient for NoopClient {
        async fn fetch_pull_requests(&self, _repo: &str) -> anyhow::Result<Vec<PullRequest>> {
            Ok(vec![])
        }
        async fn fetch_pr_detail(&self, _repo: &str, _number: u64) -> anyhow::Result<PrDetail> {
            Ok(PrDetail::default())
        }
        async fn fetch_reviews(&self, _repo: &str, _number: u64) -> anyhow::Result<Vec<Review>> {
            Ok(vec![])
        }
        async fn fetch_review_comments(
            &self,
            _repo: &str,
            _number: u64,
        ) -> anyhow::Result<Vec<ReviewComment>> {
            Ok(vec![])
        }
        async fn fetch_issue_comments(
            &self,
            _repo: &str,
            _number: u64,
        ) -> anyhow::Result<Vec<IssueComment>> {
            Ok(vec![])
        }
        async fn fetch_thread_resolution(
            &self,
            _repo: &str,
            _number: u64,
        ) -> anyhow::Result<ThreadResolutionMap> {
            Ok(ThreadResolutionMap::new())
        }
        async fn fetch_check_runs(
            &self,
            _repo: &str,
            _head_sha: &str,
        ) -> anyhow::Result<Vec<CheckRun>> {
            Ok(vec![])
        }
        async fn fetch_combined_status(
            &self,
            _repo: &str,
            _head_sha: &str,
        ) -> anyhow::Result<Option<CiStatus>> {
            Ok(None)
        }
        async fn fetch_required_status_checks(
            &self,
            _repo: &str,
            _branch: &str,
        ) -> anyhow::Result<Option<Vec<String>>> {
            Ok(None)
        }
        async fn submit_review(
            &self,
            _repo: &str,
            _number: u64,
            _submission: ReviewSubmission,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn reply_to_thread(
            &self,
            _repo: &str,
            _number: u64,
            _in_reply_to: i64,
            _body: &str,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn create_issue_comment(
            &self,
            _repo: &str,
            _number: u64,
            _body: &str,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn toggle_draft(&self, _repo: &str, _number: u64, _is_draft: bool) -> anyhow::Result<()> {
            Ok(())
        }
        async fn validate_token(&self, _token: &str) -> anyhow::Result<String> {
            Ok("octocat".to_string())
        }
    }

    #[tokio::test]
    async fn empty_provider_has_no_client() {
        let provider = ClientProvider::empty();
        assert!(!provider.has_client().await);
        let (client, username) = provider.get().await;
        assert!(client.is_none());
        assert!(username.is_none());
    }

    #[tokio::test]
    async fn replace_swaps_client_and_username_together() {
        let provider = ClientProvider::empty();
        provider
            .replace(Some(Arc::new(NoopClient) as Arc<dyn UpstreamClient>), Some("octocat".to_string()))
            .await;

        assert!(provider.has_client().await);
        let (client, username) = provider.get().await;
        assert!(client.is_some());
        assert_eq!(username.as_deref(), Some("octocat"));
    }

    #[tokio::test]
    async fn replace_with_none_clears_both_fields() {
        let provider = ClientProvider::with_client(Arc::new(NoopClient), "octocat".to_string());
        provider.replace(None, None).await;

        assert!(!provider.has_client().await);
        let (client, username) = provider.get().await;
        assert!(client.is_none());
        assert!(username.is_none());
    }
}
