//! Environment loading: `.env` via dotenvy, the JSON config file, and
//! per-class overrides.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use dotenvy::dotenv;

use crate::config::SchedulerConfig;
use crate::core::AppResult;

/// Path of the JSON configuration file.
pub const CONFIG_PATH_VAR: &str = "SCHEDULER_CONFIG";
/// Overrides [`SchedulerConfig::owner`].
pub const OWNER_VAR: &str = "SCHEDULER_OWNER";
/// Base URL of the inventory indexer.
pub const INDEXER_URL_VAR: &str = "SCHEDULER_INDEXER_URL";
/// Base URL of the chain RPC node.
pub const RPC_URL_VAR: &str = "SCHEDULER_RPC_URL";
/// Prefix of `SCHEDULER_ENABLE_RECHARGE_<CLASS>=true|false`.
pub const ENABLE_RECHARGE_PREFIX: &str = "SCHEDULER_ENABLE_RECHARGE_";
/// Overrides [`SecondaryConfig::enabled`](crate::config::SecondaryConfig::enabled).
pub const ENABLE_SECONDARY_VAR: &str = "SCHEDULER_ENABLE_SECONDARY";

/// Default indexer endpoint.
pub const DEFAULT_INDEXER_URL: &str = "https://wax.api.atomicassets.io";
/// Default RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "https://wax.greymass.com";
/// Default config path.
pub const DEFAULT_CONFIG_PATH: &str = "scheduler.json";

/// Endpoints and paths resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSettings {
    /// Config file path.
    pub config_path: PathBuf,
    /// Indexer base URL.
    pub indexer_url: String,
    /// RPC base URL.
    pub rpc_url: String,
}

impl EnvSettings {
    /// Resolve settings from `(key, value)` pairs, applying defaults.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut settings = Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            indexer_url: DEFAULT_INDEXER_URL.into(),
            rpc_url: DEFAULT_RPC_URL.into(),
        };
        for (key, value) in vars {
            match key.as_str() {
                CONFIG_PATH_VAR => settings.config_path = PathBuf::from(value),
                INDEXER_URL_VAR => settings.indexer_url = value,
                RPC_URL_VAR => settings.rpc_url = value,
                _ => {}
            }
        }
        settings
    }
}

/// Apply environment overrides to a parsed config.
///
/// # Errors
///
/// Fails when an enable flag is not `true`/`false`, names no class, or
/// enables a secondary craft that is not configured.
pub fn apply_overrides<I>(cfg: &mut SchedulerConfig, vars: I) -> Result<(), String>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if key == OWNER_VAR {
            cfg.owner = value.trim().to_ascii_lowercase();
            continue;
        }
        if key == ENABLE_SECONDARY_VAR {
            let enabled = parse_flag(&key, &value)?;
            match cfg.secondary.as_mut() {
                Some(secondary) => secondary.enabled = enabled,
                None if enabled => return Err(format!("{key}: no secondary craft configured")),
                None => {}
            }
            tracing::info!("secondary craft set to {} from environment", enabled);
            continue;
        }
        let Some(class) = key.strip_prefix(ENABLE_RECHARGE_PREFIX) else {
            continue;
        };
        let enabled = parse_flag(&key, &value)?;
        let entry = cfg
            .class_mut(class)
            .ok_or_else(|| format!("{key}: no class named `{}`", class.to_ascii_lowercase()))?;
        entry.recharge_enabled = enabled;
        tracing::info!("recharge for {} set to {} from environment", entry.id, enabled);
    }
    Ok(())
}

fn parse_flag(key: &str, value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(format!("{key}: expected true or false, got `{other}`")),
    }
}

/// Load `.env`, read the config file, apply overrides and validate.
///
/// # Errors
///
/// Fails when the config file cannot be read, parsed or validated.
pub fn load() -> AppResult<(SchedulerConfig, EnvSettings)> {
    if let Err(e) = dotenv() {
        tracing::debug!("no .env loaded: {}", e);
    }
    let settings = EnvSettings::from_vars(env::vars());
    let raw = std::fs::read_to_string(&settings.config_path)
        .with_context(|| format!("reading {}", settings.config_path.display()))?;
    let mut cfg: SchedulerConfig =
        serde_json::from_str(&raw).map_err(|e| anyhow!("parse error: {e}"))?;
    apply_overrides(&mut cfg, env::vars()).map_err(|e| anyhow!(e))?;
    cfg.validate().map_err(|e| anyhow!("invalid config: {e}"))?;
    Ok((cfg, settings))
}
