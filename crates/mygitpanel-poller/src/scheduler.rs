//! Poll scheduler (spec §4.2): a single-threaded cooperative worker that
//! owns the adaptive per-repo schedule, drains manual-refresh requests
//! ahead of each timed wake, and never polls two repos concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mygitpanel_core::store::Store;
use mygitpanel_provider::ClientProvider;
use tokio_util::sync::CancellationToken;

use crate::poll_cycle::poll_repo;
use crate::refresh::{RefreshOutcome, RefreshReceiver, RefreshRequest};
use crate::schedule::ScheduleRecord;

/// Wake cadence when no repo is tracked yet; avoids a busy loop while
/// still noticing newly-added repos promptly.
const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub struct PollScheduler {
    store: Arc<dyn Store>,
    client_provider: Arc<ClientProvider>,
    configured_username: String,
    configured_team_slugs: Vec<String>,
    refresh_rx: RefreshReceiver,
    cancel: CancellationToken,
    schedules: HashMap<String, ScheduleRecord>,
}

impl PollScheduler {
    pub fn new(
        store: Arc<dyn Store>,
        client_provider: Arc<ClientProvider>,
        configured_username: String,
        configured_team_slugs: Vec<String>,
        refresh_rx: RefreshReceiver,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            client_provider,
            configured_username,
            configured_team_slugs,
            refresh_rx,
            cancel,
            schedules: HashMap::new(),
        }
    }

    /// Runs until cancelled. Intended to be spawned as its own task.
    pub async fn run(mut self) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.sync_tracked_repos().await;

            while let Ok(request) = self.refresh_rx.try_recv() {
                self.serve_refresh(request).await;
            }

            let sleep_duration = self.next_sleep_duration();

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                maybe_request = self.refresh_rx.recv() => {
                    if let Some(request) = maybe_request {
                        self.serve_refresh(request).await;
                    }
                    continue;
                }
                _ = tokio::time::sleep(sleep_duration) => {}
            }

            let now = Utc::now();
            let due: Vec<String> = self
                .schedules
                .iter()
                .filter(|(_, record)| record.next_poll_at <= now)
                .map(|(repo, _)| repo.clone())
                .collect();

            for repo in due {
                self.poll_and_reclassify(&repo).await;
            }
        }

        log::info!("poll scheduler shutting down");
    }

    async fn sync_tracked_repos(&mut self) {
        let repos = match self.store.list_repos(&self.cancel).await {
            Ok(repos) => repos,
            Err(err) => {
                log::warn!("failed to list tracked repos, keeping existing schedule: {err}");
                return;
            }
        };

        let now = Utc::now();
        let tracked: std::collections::HashSet<String> =
            repos.iter().map(|r| r.full_name()).collect();

        self.schedules.retain(|repo, _| tracked.contains(repo));
        for full_name in tracked {
            self.schedules
                .entry(full_name.clone())
                .or_insert_with(|| ScheduleRecord::new(full_name, now));
        }
    }

    fn next_sleep_duration(&self) -> Duration {
        let Some(earliest) = self.schedules.values().map(|s| s.next_poll_at).min() else {
            return IDLE_POLL_INTERVAL;
        };
        let now = Utc::now();
        if earliest <= now {
            Duration::from_millis(0)
        } else {
            (earliest - now).to_std().unwrap_or(IDLE_POLL_INTERVAL)
        }
    }

    async fn serve_refresh(&mut self, request: RefreshRequest) {
        let RefreshRequest {
            repo_full_name,
            pr_number,
            done,
        } = request;

        if let Some(number) = pr_number {
            log::info!(
                "manual refresh requested for PR #{number} in {:?}; re-polling whole repository",
                repo_full_name
            );
        }

        let targets: Vec<String> = match &repo_full_name {
            Some(repo) => vec![repo.clone()],
            None => self.schedules.keys().cloned().collect(),
        };

        let mut errors = 0;
        for repo in &targets {
            if !self.poll_and_reclassify(repo).await {
                errors += 1;
            }
        }

        let _ = done.send(RefreshOutcome {
            repos_polled: targets.len(),
            errors,
        });
    }

    /// Returns `false` if the poll failed (logged, not propagated further).
    async fn poll_and_reclassify(&mut self, repo_full_name: &str) -> bool {
        let (client, _username) = self.client_provider.get().await;
        let Some(client) = client else {
            log::warn!("no upstream client configured, skipping poll of {repo_full_name}");
            return true;
        };

        let result = poll_repo(
            self.store.as_ref(),
            client.as_ref(),
            repo_full_name,
            &self.configured_username,
            &self.configured_team_slugs,
            &self.cancel,
        )
        .await;

        match result {
            Ok(outcome) => {
                let now = Utc::now();
                let record = self
                    .schedules
                    .entry(repo_full_name.to_string())
                    .or_insert_with(|| ScheduleRecord::new(repo_full_name.to_string(), now));
                record.reclassify(outcome.freshest_activity, now);
                true
            }
            Err(err) => {
                log::warn!("poll of {repo_full_name} failed: {err}");
                false
            }
        }
    }
}
