use crate::application_impl::DEFAULT_RENEW_INTERVAL;
use crate::application_port::AuthEndpoints;
use crate::domain_model::{DEFAULT_PUBLIC_PATHS, PublicPaths};
use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub api: Api,
    pub storage: Storage,
    #[serde(default)]
    pub session: Session,
    pub log: Log,
}

#[derive(Debug, Deserialize)]
pub struct Api {
    pub backend: String, // "fake" or "real"
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Api {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub session_login: String,
    pub token_issue: String,
    pub token_refresh: String,
    pub current_user: String,
    pub session_logout: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        let defaults = AuthEndpoints::default();
        Self {
            session_login: defaults.session_login,
            token_issue: defaults.token_issue,
            token_refresh: defaults.token_refresh,
            current_user: defaults.current_user,
            session_logout: defaults.session_logout,
        }
    }
}

impl From<&Endpoints> for AuthEndpoints {
    fn from(e: &Endpoints) -> Self {
        AuthEndpoints {
            session_login: e.session_login.clone(),
            token_issue: e.token_issue.clone(),
            token_refresh: e.token_refresh.clone(),
            current_user: e.current_user.clone(),
            session_logout: e.session_logout.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    pub backend: String, // "file" or "memory"
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Session {
    pub renew_interval_secs: u64,
    pub public_paths: Vec<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            renew_interval_secs: DEFAULT_RENEW_INTERVAL.as_secs(),
            public_paths: DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl Session {
    pub fn renew_interval(&self) -> Duration {
        Duration::from_secs(self.renew_interval_secs.max(1))
    }

    pub fn public_paths(&self) -> PublicPaths {
        PublicPaths::new(self.public_paths.iter().cloned())
    }
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

fn default_timeout_secs() -> u64 {
    15
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub const ENV_PREFIX: &str = "WAREHOUSE";

/// Loads settings from a TOML file, then lets `WAREHOUSE__SECTION__KEY`
/// environment variables override individual keys.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
