//! Repo poll cycle (spec §4.3): fetch open PRs, diff against the stored
//! set, enrich what changed, and prune PRs the upstream no longer lists
//! as open.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use mygitpanel_client::UpstreamClient;
use mygitpanel_core::models::{PrStatus, PullRequest};
use mygitpanel_core::store::Store;
use tokio_util::sync::CancellationToken;

use crate::health_enrichment::enrich_health;
use crate::review_enrichment::enrich_reviews;

/// Case-insensitive match on requested reviewer login or requested team slug.
pub fn is_review_requested_from(pr: &PullRequest, username: &str, team_slugs: &[String]) -> bool {
    let reviewer_match = !username.is_empty()
        && pr
            .requested_reviewers
            .iter()
            .any(|r| r.eq_ignore_ascii_case(username));
    let team_match = pr.requested_team_slugs.iter().any(|requested| {
        team_slugs
            .iter()
            .any(|configured| configured.eq_ignore_ascii_case(requested))
    });
    reviewer_match || team_match
}

pub struct PollCycleResult {
    /// Freshest `last_activity_at` across the repo's now-current stored
    /// PRs; `None` if the repo has no PRs left (both map to the stale
    /// poll tier).
    pub freshest_activity: Option<DateTime<Utc>>,
}

/// Step 1 (no client → skip) is the caller's responsibility: it polls
/// every repo using one resolved client per wake rather than re-checking
/// per repo.
pub async fn poll_repo(
    store: &dyn Store,
    client: &dyn UpstreamClient,
    repo_full_name: &str,
    configured_username: &str,
    configured_team_slugs: &[String],
    cancel: &CancellationToken,
) -> anyhow::Result<PollCycleResult> {
    let fetched = client.fetch_pull_requests(repo_full_name).await?;

    let stored = store
        .list_by_repo(repo_full_name, cancel)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    let mut stored_by_number: HashMap<u64, PullRequest> =
        stored.into_iter().map(|pr| (pr.number, pr)).collect();

    let mut fetched_numbers = HashSet::with_capacity(fetched.len());

    for mut pr in fetched {
        fetched_numbers.insert(pr.number);
        pr.needs_review = is_review_requested_from(&pr, configured_username, configured_team_slugs);

        let existing = stored_by_number.remove(&pr.number);
        let unchanged = existing
            .as_ref()
            .is_some_and(|s| s.updated_at == pr.updated_at && s.needs_review == pr.needs_review);
        if unchanged {
            continue;
        }

        let id = match store.upsert(&pr, cancel).await {
            Ok(id) => id,
            Err(err) => {
                log::warn!("{repo_full_name}#{}: failed to upsert PR: {err}", pr.number);
                continue;
            }
        };
        pr.id = Some(id);

        enrich_reviews(store, client, repo_full_name, pr.number, id, cancel).await;
        enrich_health(store, client, repo_full_name, &mut pr, cancel).await;
    }

    for (number, stale) in stored_by_number {
        if fetched_numbers.contains(&number) || stale.status != PrStatus::Open {
            continue;
        }
        if let Err(err) = store.delete(repo_full_name, number, cancel).await {
            log::warn!("{repo_full_name}#{number}: failed to delete stale PR: {err}");
        }
    }

    let remaining = store
        .list_by_repo(repo_full_name, cancel)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    let freshest_activity = remaining.iter().map(|pr| pr.last_activity_at).max();

    Ok(PollCycleResult { freshest_activity })
}
