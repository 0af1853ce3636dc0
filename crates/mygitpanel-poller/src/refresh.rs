//! Manual-refresh rendezvous channel (spec §4.2 "Manual refresh"): API
//! handlers deliver a request and await the worker's reply on `done`
//! rather than racing the periodic cycle directly.

use tokio::sync::{mpsc, oneshot};

/// A poll-all request has `repo_full_name = None`. `pr_number` is carried
/// for audit logging only — there is no single-PR fetch on the open-list
/// endpoint, so the worker re-polls the whole repository regardless.
#[derive(Debug)]
pub struct RefreshRequest {
    pub repo_full_name: Option<String>,
    pub pr_number: Option<u64>,
    pub done: oneshot::Sender<RefreshOutcome>,
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub repos_polled: usize,
    pub errors: usize,
}

pub type RefreshSender = mpsc::Sender<RefreshRequest>;
pub type RefreshReceiver = mpsc::Receiver<RefreshRequest>;

/// Bounded to a small queue depth: refresh requests are meant to be rare,
/// interactive, and served promptly, never buffered deeply.
pub fn refresh_channel() -> (RefreshSender, RefreshReceiver) {
    mpsc::channel(16)
}
