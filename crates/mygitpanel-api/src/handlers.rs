//! Handler implementations for the stable HTTP surface (spec §6).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use mygitpanel_core::models::{PullRequest, Repository, Review, ReviewState, Thresholds};
use mygitpanel_core::store::{
    BotConfigStore, IssueCommentStore, PullRequestStore, RepoStore, ReviewCommentStore,
    ReviewStore, SettingsStore,
};
use mygitpanel_poller::RefreshRequest;
use mygitpanel_signals::{
    build_review_summary, compute_attention_signals, AttentionInput, AttentionSignals,
    PrReviewSummary,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::validate_full_name;

pub async fn list_prs(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let cancel = CancellationToken::new();
    let prs = state.store.list_all_excluding_ignored(&cancel).await?;
    Ok(Json(prs))
}

pub async fn list_attention_prs(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let cancel = CancellationToken::new();
    let prs = state.store.list_attention_excluding_ignored(&cancel).await?;
    Ok(Json(prs))
}

#[derive(Serialize)]
pub struct PrDetailResponse {
    #[serde(flatten)]
    pub pr: PullRequest,
    pub attention: AttentionSignals,
    pub review: PrReviewSummary,
}

/// Assembles the PR plus its derived attention signals and review summary
/// (spec §4.8). Store read errors for the derived pieces degrade rather
/// than fail the whole request: an unreachable settings row just falls
/// back to the global defaults, since the PR row itself is the only part
/// of this response callers can't do without.
pub async fn get_pr(
    State(state): State<AppState>,
    Path((owner, repo, number)): Path<(String, String, u64)>,
) -> Result<impl IntoResponse, ApiError> {
    let cancel = CancellationToken::new();
    let full_name = format!("{owner}/{repo}");
    validate_full_name(&full_name)?;

    let pr = state
        .store
        .get_by_number(&full_name, number, &cancel)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("PR not found: {full_name}#{number}")))?;
    let pr_id = pr.id.expect("a PR read back from the store always has a surrogate id");

    let reviews = ReviewStore::list_by_pr(&*state.store, pr_id, &cancel)
        .await
        .unwrap_or_else(|err| {
            log::warn!("failed to load reviews for {full_name}#{number}: {err}");
            Vec::new()
        });
    let review_comments = ReviewCommentStore::list_by_pr(&*state.store, pr_id, &cancel)
        .await
        .unwrap_or_else(|err| {
            log::warn!("failed to load review comments for {full_name}#{number}: {err}");
            Vec::new()
        });
    let issue_comments = IssueCommentStore::list_by_pr(&*state.store, pr_id, &cancel)
        .await
        .unwrap_or_else(|err| {
            log::warn!("failed to load issue comments for {full_name}#{number}: {err}");
            Vec::new()
        });
    let bot_usernames = state
        .store
        .list_bots(&cancel)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|b| b.username)
        .collect::<Vec<_>>();

    let review = build_review_summary(
        reviews,
        review_comments,
        issue_comments,
        &std::collections::HashMap::new(),
        &bot_usernames,
        &pr.head_sha,
    );

    let overrides = state.store.get_overrides(&full_name, &cancel).await.unwrap_or_else(|err| {
        log::warn!("failed to load threshold overrides for {full_name}: {err}");
        Default::default()
    });
    let thresholds = Thresholds::with_overrides(overrides);

    let (_, authenticated_username) = state.client_provider.get().await;
    let authenticated_username = authenticated_username.unwrap_or_default();

    let approval_count = latest_approvals(&review.reviews);
    let user_last_review_sha = review
        .reviews
        .iter()
        .filter(|r| r.reviewer_login.eq_ignore_ascii_case(&authenticated_username))
        .max_by_key(|r| r.submitted_at)
        .map(|r| r.commit_id.as_str())
        .unwrap_or("");

    let attention = compute_attention_signals(AttentionInput {
        pr: &pr,
        thresholds,
        authenticated_username: &authenticated_username,
        approval_count,
        user_last_review_sha,
        now: Utc::now(),
    });

    Ok(Json(PrDetailResponse { pr, attention, review }))
}

/// Distinct non-bot reviewers whose latest review approved, matching the
/// aggregate-status tiebreak (spec §4.8.2: latest review per reviewer).
fn latest_approvals(reviews: &[Review]) -> u32 {
    use std::collections::HashMap;

    let mut latest: HashMap<&str, &Review> = HashMap::new();
    for review in reviews {
        if review.is_bot {
            continue;
        }
        latest
            .entry(review.reviewer_login.as_str())
            .and_modify(|current| {
                if review.submitted_at >= current.submitted_at {
                    *current = review;
                }
            })
            .or_insert(review);
    }
    latest.values().filter(|r| r.state == ReviewState::Approved).count() as u32
}

pub async fn list_repos(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let cancel = CancellationToken::new();
    let repos = state.store.list_repos(&cancel).await?;
    Ok(Json(repos))
}

#[derive(Deserialize)]
pub struct AddRepoRequest {
    pub full_name: String,
}

pub async fn add_repo(
    State(state): State<AppState>,
    Json(body): Json<AddRepoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_full_name(&body.full_name)?;
    let (owner, name) = body
        .full_name
        .split_once('/')
        .expect("validate_full_name guarantees exactly one '/'");

    let repo = Repository {
        owner: owner.to_string(),
        name: name.to_string(),
        added_at: Utc::now(),
    };

    let cancel = CancellationToken::new();
    state.store.add_repo(repo.clone(), &cancel).await?;

    let (done_tx, done_rx) = oneshot::channel();
    let request = RefreshRequest {
        repo_full_name: Some(repo.full_name()),
        pr_number: None,
        done: done_tx,
    };
    if state.refresh_tx.send(request).await.is_err() {
        log::warn!("refresh channel closed, repo {} won't be polled until the next scheduled tick", repo.full_name());
    } else {
        tokio::spawn(async move {
            if done_rx.await.is_err() {
                log::debug!("refresh request dropped before completion");
            }
        });
    }

    Ok((StatusCode::CREATED, Json(repo)))
}

pub async fn delete_repo(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let cancel = CancellationToken::new();
    let full_name = format!("{owner}/{repo}");
    validate_full_name(&full_name)?;

    let deleted = state.store.delete_repo(&full_name, &cancel).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("repository not tracked: {full_name}")))
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "time": Utc::now() }))
}
