//! Health enrichment (spec §4.6/§4.7): PR detail, check runs, combined
//! status, required-check matching, and the resulting combined CI
//! status, all persisted back onto the PR row.

use mygitpanel_client::UpstreamClient;
use mygitpanel_core::models::{CheckRun, CheckRunStatus, CiStatus, PullRequest};
use mygitpanel_core::store::Store;
use tokio_util::sync::CancellationToken;

fn ci_status_for_check_run(run: &CheckRun) -> CiStatus {
    if run.status != CheckRunStatus::Completed {
        return CiStatus::Pending;
    }
    use mygitpanel_core::models::CheckConclusion::*;
    match run.conclusion {
        Some(Failure) | Some(Cancelled) | Some(TimedOut) | Some(ActionRequired) => {
            CiStatus::Failing
        }
        Some(Success) | Some(Neutral) | Some(Skipped) => CiStatus::Passing,
        None => CiStatus::Pending,
    }
}

/// Mutates `pr` in place and persists the updated row via the store.
/// Runs best-effort: each sub-step's failure is logged and degrades
/// rather than aborting the whole PR poll, except step 2 (check runs),
/// whose failure aborts the remaining health-enrichment steps because
/// required-check matching and combined status are meaningless without
/// the run set.
pub async fn enrich_health(
    store: &dyn Store,
    client: &dyn UpstreamClient,
    repo: &str,
    pr: &mut PullRequest,
    cancel: &CancellationToken,
) {
    let number = pr.number;

    match client.fetch_pr_detail(repo, number).await {
        Ok(detail) => {
            pr.additions = detail.additions;
            pr.deletions = detail.deletions;
            pr.changed_files = detail.changed_files;
            pr.mergeable_status = detail.mergeable_status;
        }
        Err(err) => log::warn!("{repo}#{number}: failed to fetch PR detail: {err}"),
    }

    let mut check_runs = match client.fetch_check_runs(repo, &pr.head_sha).await {
        Ok(runs) => runs,
        Err(err) => {
            log::warn!("{repo}#{number}: failed to fetch check runs, aborting health enrichment: {err}");
            return;
        }
    };

    let combined_status = match client.fetch_combined_status(repo, &pr.head_sha).await {
        Ok(status) => status,
        Err(err) => {
            log::warn!("{repo}#{number}: failed to fetch combined status, degrading to none: {err}");
            None
        }
    };

    let required_contexts = match client.fetch_required_status_checks(repo, &pr.base_branch).await {
        Ok(contexts) => contexts.unwrap_or_default(),
        Err(err) => {
            log::warn!(
                "{repo}#{number}: failed to fetch required status checks, treating as none: {err}"
            );
            Vec::new()
        }
    };

    for run in &mut check_runs {
        run.pr_id = pr.id.unwrap_or_default();
        run.is_required = required_contexts
            .iter()
            .any(|ctx| ctx.eq_ignore_ascii_case(&run.name));
    }

    let mut ci_status = check_runs
        .iter()
        .fold(CiStatus::Unknown, |acc, run| acc.combine(ci_status_for_check_run(run)));
    if let Some(combined) = combined_status {
        ci_status = ci_status.combine(combined);
    }

    if let Some(pr_id) = pr.id {
        if let Err(err) = store.replace_for_pr(pr_id, check_runs, cancel).await {
            log::warn!("{repo}#{number}: failed to replace check runs: {err}");
        }
    }

    pr.ci_status = ci_status;
    if let Err(err) = store.upsert(pr, cancel).await {
        log::warn!("{repo}#{number}: failed to persist health enrichment: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mygitpanel_core::models::CheckConclusion;

    fn check_run(status: CheckRunStatus, conclusion: Option<CheckConclusion>) -> CheckRun {
        CheckRun {
            id: 1,
            pr_id: 0,
            name: "build".to_string(),
            status,
            conclusion,
            is_required: false,
            details_url: None,
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn in_progress_run_classifies_as_pending() {
        let run = check_run(CheckRunStatus::InProgress, None);
        assert_eq!(ci_status_for_check_run(&run), CiStatus::Pending);
    }

    #[test]
    fn completed_failure_classifies_as_failing() {
        let run = check_run(CheckRunStatus::Completed, Some(CheckConclusion::Failure));
        assert_eq!(ci_status_for_check_run(&run), CiStatus::Failing);
    }

    #[test]
    fn completed_success_classifies_as_passing() {
        let run = check_run(CheckRunStatus::Completed, Some(CheckConclusion::Success));
        assert_eq!(ci_status_for_check_run(&run), CiStatus::Passing);
    }
}
