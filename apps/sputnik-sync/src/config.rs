use crate::api::ResetRequest;
use anyhow::{Result, bail};
use reqwest::Url;
use serde::Deserialize;
use std::{env, fmt::Display, fs, str::FromStr, time::Duration};
use tracing::{info, warn};
use utils::errors::{BASE_URL_INVALID, CONTRACT_NOT_SET, REQUEST_TIMEOUT_ZERO};

pub const CONFIG_PATH_ENV: &str = "SPUTNIK_SYNC_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "sputnik-sync.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Local,
    #[default]
    Remote,
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(format!("unknown target {other:?}, expected local or remote")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetKind {
    #[default]
    None,
    Admin,
    Rewind,
}

impl FromStr for ResetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "admin" => Ok(Self::Admin),
            "rewind" => Ok(Self::Rewind),
            other => Err(format!(
                "unknown reset mode {other:?}, expected none, admin or rewind"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub target: Target,
    pub local_url: String,
    pub fly_app_name: String,
    /// Wins over `target` when set.
    pub base_url: Option<String>,
    pub contract: String,
    pub max_calls: u32,
    pub delay_ms: u64,
    pub reset: ResetKind,
    pub rewind_block: u64,
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            target: Target::Remote,
            local_url: "http://localhost:8080".to_string(),
            fly_app_name: "sputnik-indexer-2".to_string(),
            base_url: None,
            contract: "testing-treasury.sputnik-dao.near".to_string(),
            // enough for devhub to catch up to the latest block
            max_calls: 120,
            delay_ms: 500,
            reset: ResetKind::None,
            rewind_block: 0,
            request_timeout_secs: 30,
        }
    }
}

impl SyncConfig {
    pub fn base_url(&self) -> String {
        if let Some(base_url) = &self.base_url {
            return base_url.clone();
        }

        match self.target {
            Target::Local => self.local_url.clone(),
            Target::Remote => format!("https://{}.fly.dev", self.fly_app_name),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reset_request(&self) -> Option<ResetRequest> {
        match self.reset {
            ResetKind::None => None,
            ResetKind::Admin => Some(ResetRequest::Admin),
            ResetKind::Rewind => Some(ResetRequest::RewindToBlock(self.rewind_block)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.contract.trim().is_empty() {
            bail!(CONTRACT_NOT_SET);
        }

        let base_url = self.base_url();
        match Url::parse(&base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(_) => bail!("{BASE_URL_INVALID}: {base_url}"),
            Err(err) => bail!("{BASE_URL_INVALID}: {base_url} ({err})"),
        }

        if self.request_timeout_secs == 0 {
            bail!(REQUEST_TIMEOUT_ZERO);
        }

        Ok(())
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }
}

/// Reads the YAML file named by `SPUTNIK_SYNC_CONFIG_PATH`, applies
/// `SPUTNIK_SYNC_*` overrides and validates the result.
pub fn load() -> Result<SyncConfig> {
    let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = load_file(&path);

    apply_overrides(&mut config, |key| env::var(key).ok());
    config.validate()?;

    info!(
        base_url = %config.base_url(),
        contract = %config.contract,
        max_calls = config.max_calls,
        delay_ms = config.delay_ms,
        reset = ?config.reset,
        "Sync config loaded"
    );

    Ok(config)
}

fn load_file(path: &str) -> SyncConfig {
    match fs::read_to_string(path) {
        Ok(contents) => match SyncConfig::from_yaml(&contents) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, path = %path, "Failed to parse sync config, using defaults");
                SyncConfig::default()
            }
        },
        Err(err) => {
            warn!(error = %err, path = %path, "Sync config not found, using defaults");
            SyncConfig::default()
        }
    }
}

pub fn apply_overrides<F>(config: &mut SyncConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("SPUTNIK_SYNC_LOCAL_URL") {
        config.local_url = value;
    }
    if let Some(value) = lookup("SPUTNIK_SYNC_FLY_APP") {
        config.fly_app_name = value;
    }
    if let Some(value) = lookup("SPUTNIK_SYNC_BASE_URL") {
        config.base_url = Some(value);
    }
    if let Some(value) = lookup("SPUTNIK_SYNC_CONTRACT") {
        config.contract = value;
    }

    override_parsed(&lookup, "SPUTNIK_SYNC_TARGET", &mut config.target);
    override_parsed(&lookup, "SPUTNIK_SYNC_MAX_CALLS", &mut config.max_calls);
    override_parsed(&lookup, "SPUTNIK_SYNC_DELAY_MS", &mut config.delay_ms);
    override_parsed(&lookup, "SPUTNIK_SYNC_RESET", &mut config.reset);
    override_parsed(&lookup, "SPUTNIK_SYNC_REWIND_BLOCK", &mut config.rewind_block);
    override_parsed(
        &lookup,
        "SPUTNIK_SYNC_TIMEOUT_SECS",
        &mut config.request_timeout_secs,
    );
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let Some(value) = lookup(key) else {
        return;
    };

    match value.trim().parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(err) => {
            warn!(error = %err, key, value = %value, "Failed to parse sync config override");
        }
    }
}
