//! Application configuration, loaded from the process environment
//! (spec §6). `dotenvy::dotenv()` is loaded first so a local `.env`
//! file works the same way as exported shell variables.

use std::env;

use mygitpanel_core::models::SecretString;
use mygitpanel_core::CoreError;

fn default_poll_interval() -> chrono::Duration {
    chrono::Duration::minutes(5)
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_db_path() -> String {
    "./mygitpanel.db".to_string()
}

#[derive(Clone)]
pub struct AppConfig {
    /// Absent means polling is disabled and writes fail with
    /// *credentials not configured* until one is supplied through the API.
    pub github_token: Option<SecretString>,
    pub github_username: String,
    /// Lower-cased team slugs, for the case-insensitive match in the repo
    /// poll cycle's review-request check.
    pub github_teams: Vec<String>,
    pub poll_interval: chrono::Duration,
    pub listen_addr: String,
    pub db_path: String,
    /// Absent disables the credential store.
    pub secret_key: Option<[u8; 32]>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .field("github_username", &self.github_username)
            .field("github_teams", &self.github_teams)
            .field("poll_interval", &self.poll_interval)
            .field("listen_addr", &self.listen_addr)
            .field("db_path", &self.db_path)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AppConfig {
    /// Loads from `std::env`, failing fast on the one genuinely required
    /// variable. `.env` is loaded first (if present) and never overrides
    /// an already-exported variable.
    pub fn load() -> Result<Self, CoreError> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("loaded environment overrides from {}", path.display()),
            Err(dotenvy::Error::Io(_)) => log::debug!("no .env file found, using process environment only"),
            Err(err) => log::warn!("failed to parse .env file: {err}"),
        }

        let github_token = env::var("GITHUB_TOKEN").ok().map(SecretString::new);

        let github_username = env::var("GITHUB_USERNAME")
            .map_err(|_| CoreError::Config("GITHUB_USERNAME is required".to_string()))?;
        if github_username.trim().is_empty() {
            return Err(CoreError::Config("GITHUB_USERNAME must not be empty".to_string()));
        }

        let github_teams = env::var("GITHUB_TEAMS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|slug| slug.trim().to_lowercase())
                    .filter(|slug| !slug.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let poll_interval = match env::var("POLL_INTERVAL").ok() {
            Some(raw) => parse_poll_interval(&raw)?,
            None => default_poll_interval(),
        };

        let listen_addr = env::var("LISTEN_ADDR").unwrap_or_else(|_| default_listen_addr());
        let db_path = env::var("DB_PATH").unwrap_or_else(|_| default_db_path());

        let secret_key = match env::var("SECRET_KEY").ok() {
            Some(raw) => Some(parse_secret_key(&raw)?),
            None => {
                log::info!("SECRET_KEY not set, credential store disabled");
                None
            }
        };

        Ok(Self {
            github_token,
            github_username,
            github_teams,
            poll_interval,
            listen_addr,
            db_path,
            secret_key,
        })
    }
}

/// Accepts a plain integer (seconds) or a `\d+[smh]` suffix form, e.g. `5m`.
fn parse_poll_interval(raw: &str) -> Result<chrono::Duration, CoreError> {
    let raw = raw.trim();
    let invalid = || CoreError::Config(format!("invalid POLL_INTERVAL: {raw}"));

    if let Ok(seconds) = raw.parse::<i64>() {
        return Ok(chrono::Duration::seconds(seconds));
    }

    let (digits, unit) = raw.split_at(raw.len() - 1);
    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    match unit {
        "s" => Ok(chrono::Duration::seconds(amount)),
        "m" => Ok(chrono::Duration::minutes(amount)),
        "h" => Ok(chrono::Duration::hours(amount)),
        _ => Err(invalid()),
    }
}

fn parse_secret_key(raw: &str) -> Result<[u8; 32], CoreError> {
    let bytes = hex::decode(raw.trim())
        .map_err(|_| CoreError::Config("SECRET_KEY must be valid hex".to_string()))?;
    bytes
        .try_into()
        .map_err(|_| CoreError::Config("SECRET_KEY must decode to exactly 32 bytes".to_string()))
}
