//! Review enrichment (spec §4.5): four independent, best-effort fetches
//! against a changed PR. Each step's failure is logged with repo/PR scope
//! and never aborts the others — a poll that completes without reviews
//! is a valid outcome.

use mygitpanel_client::UpstreamClient;
use mygitpanel_core::store::Store;
use tokio_util::sync::CancellationToken;

pub async fn enrich_reviews(
    store: &dyn Store,
    client: &dyn UpstreamClient,
    repo: &str,
    number: u64,
    pr_id: i64,
    cancel: &CancellationToken,
) {
    let bot_usernames: Vec<String> = match store.list_bots(cancel).await {
        Ok(bots) => bots.into_iter().map(|b| b.username).collect(),
        Err(err) => {
            log::warn!("{repo}#{number}: failed to load bot config, treating as empty: {err}");
            Vec::new()
        }
    };
    let is_bot = |login: &str| bot_usernames.iter().any(|b| b.eq_ignore_ascii_case(login));

    match client.fetch_reviews(repo, number).await {
        Ok(reviews) => {
            for mut review in reviews {
                review.pr_id = pr_id;
                review.is_bot = review.is_bot || is_bot(&review.reviewer_login);
                if let Err(err) = store.upsert_review(&review, cancel).await {
                    log::warn!("{repo}#{number}: failed to store review {}: {err}", review.id);
                }
            }
        }
        Err(err) => log::warn!("{repo}#{number}: failed to fetch reviews: {err}"),
    }

    match client.fetch_review_comments(repo, number).await {
        Ok(comments) => {
            for mut comment in comments {
                comment.pr_id = pr_id;
                if let Err(err) = store.upsert_comment(&comment, cancel).await {
                    log::warn!(
                        "{repo}#{number}: failed to store review comment {}: {err}",
                        comment.id
                    );
                }
            }
        }
        Err(err) => log::warn!("{repo}#{number}: failed to fetch review comments: {err}"),
    }

    match client.fetch_issue_comments(repo, number).await {
        Ok(comments) => {
            for mut comment in comments {
                comment.pr_id = pr_id;
                comment.is_bot = comment.is_bot || is_bot(&comment.author);
                if let Err(err) = store.upsert(&comment, cancel).await {
                    log::warn!(
                        "{repo}#{number}: failed to store issue comment {}: {err}",
                        comment.id
                    );
                }
            }
        }
        Err(err) => log::warn!("{repo}#{number}: failed to fetch issue comments: {err}"),
    }

    match client.fetch_thread_resolution(repo, number).await {
        Ok(resolutions) => {
            for (root_comment_id, resolved) in resolutions {
                if let Err(err) = store.set_resolution(root_comment_id, resolved, cancel).await {
                    log::warn!(
                        "{repo}#{number}: failed to update resolution for comment {root_comment_id}: {err}"
                    );
                }
            }
        }
        Err(err) => log::warn!("{repo}#{number}: failed to fetch thread resolution: {err}"),
    }
}
