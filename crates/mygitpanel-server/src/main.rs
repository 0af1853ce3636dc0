//! Process entry point: loads configuration, opens the store, builds
//! the upstream client (if a token is configured), wires the poll
//! scheduler and HTTP listener together, and drives graceful shutdown
//! (spec §5, ~10s shutdown budget).

use std::sync::Arc;
use std::time::Duration;

use mygitpanel_api::{build_router, AppState};
use mygitpanel_client::{CacheMode, CachedGitHubClient, OctocrabClient, UpstreamClient};
use mygitpanel_config::AppConfig;
use mygitpanel_core::CoreError;
use mygitpanel_core::store::Store;
use mygitpanel_poller::{refresh_channel, PollScheduler};
use mygitpanel_provider::ClientProvider;
use mygitpanel_store::SqliteStore;
use tokio_util::sync::CancellationToken;

const SHUTDOWN_BUDGET: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            log::error!("configuration error: {err}");
            std::process::exit(1);
        }
    };
    log::info!("starting mygitpanel-server: {config:?}");

    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&config.db_path, config.secret_key)?);

    let client_provider = Arc::new(build_client_provider(&config).await?);

    let (refresh_tx, refresh_rx) = refresh_channel();
    let cancel = CancellationToken::new();

    let scheduler = PollScheduler::new(
        store.clone(),
        client_provider.clone(),
        config.github_username.clone(),
        config.github_teams.clone(),
        refresh_rx,
        cancel.clone(),
    );
    let scheduler_handle = tokio::spawn(scheduler.run());

    let app_state = AppState {
        store: store.clone(),
        refresh_tx,
        client_provider: client_provider.clone(),
    };
    let router = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    log::info!("listening on {}", config.listen_addr);

    let server_cancel = cancel.clone();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        server_cancel.cancelled().await;
    });

    tokio::select! {
        result = server => {
            if let Err(err) = result {
                log::error!("HTTP server exited with error: {err}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("received shutdown signal");
        }
    }

    cancel.cancel();
    if tokio::time::timeout(SHUTDOWN_BUDGET, scheduler_handle).await.is_err() {
        log::warn!("poll scheduler did not shut down within the {SHUTDOWN_BUDGET:?} budget");
    }

    Ok(())
}

async fn build_client_provider(config: &AppConfig) -> anyhow::Result<ClientProvider> {
    let Some(token) = &config.github_token else {
        log::warn!("GITHUB_TOKEN not set; polling disabled, writes will fail with credentials not configured");
        return Ok(ClientProvider::empty());
    };

    let octocrab = octocrab::Octocrab::builder()
        .personal_token(token.expose().to_string())
        .build()
        .map_err(|err| anyhow::anyhow!(CoreError::Config(format!("failed to build GitHub client: {err}"))))?;

    let inner = OctocrabClient::new(Arc::new(octocrab));
    let username = inner.validate_token(token.expose()).await?;
    let client: Arc<dyn UpstreamClient> = Arc::new(CachedGitHubClient::new(inner, CacheMode::ReadWrite));

    Ok(ClientProvider::with_client(client, username))
}
