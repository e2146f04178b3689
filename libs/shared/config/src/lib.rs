use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_COLLECTD_HOSTNAME: &str = "localhost";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config block {block} is missing required key: {key}")]
    MissingKey { block: String, key: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One monitored modem: where to reach it and what to call it in metric names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModemInstanceConfig {
    pub hostname: String,
    pub name: String,
}

impl ModemInstanceConfig {
    pub fn new(name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            name: name.into(),
        }
    }

    /// Root URL of the device web UI, always ending in `/`.
    ///
    /// A bare hostname gets `http://`; a hostname that already carries a
    /// scheme (handy for pointing at a test server) is kept as is.
    pub fn root_url(&self) -> String {
        let host = self.hostname.trim();
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}/", host.trim_end_matches('/'))
        } else {
            format!("http://{}/", host.trim_end_matches('/'))
        }
    }
}

/// Which sink the collector binary writes value records to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// collectd exec plugin `PUTVAL` lines on stdout.
    #[default]
    Putval,
    /// One JSON object per line on stdout.
    Json,
    /// Records go to the tracing log only.
    Log,
}

impl FromStr for SinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "putval" | "collectd" => Ok(SinkKind::Putval),
            "json" => Ok(SinkKind::Json),
            "log" => Ok(SinkKind::Log),
            other => Err(ConfigError::Invalid(format!("unknown sink: {}", other))),
        }
    }
}

/// A node of the host's raw configuration tree, e.g. one collectd
/// `<Module>` block and its `key "value"` children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigNode {
    pub key: String,
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
    #[serde(default)]
    pub children: Vec<ConfigNode>,
}

impl ConfigNode {
    pub fn leaf(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: vec![serde_json::Value::String(value.into())],
            children: Vec::new(),
        }
    }

    pub fn block(key: impl Into<String>, children: Vec<ConfigNode>) -> Self {
        Self {
            key: key.into(),
            values: Vec::new(),
            children,
        }
    }

    fn first_value(&self) -> Option<String> {
        match self.values.first()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    // collectd keys are case-insensitive
    fn child_value(&self, key: &str) -> Option<String> {
        self.children
            .iter()
            .find(|c| c.key.eq_ignore_ascii_case(key))
            .and_then(ConfigNode::first_value)
            .filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub instances: Vec<ModemInstanceConfig>,
    pub interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub keep_zero_readings: bool,
    pub sink: SinkKind,
    pub collectd_hostname: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            keep_zero_readings: false,
            sink: SinkKind::default(),
            collectd_hostname: DEFAULT_COLLECTD_HOSTNAME.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the config from a variable lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let instances = match lookup("MODEM_CONFIG_FILE") {
            Some(path) => {
                info!("Loading modem instances from {}", path);
                let tree = load_config_tree(&path)?;
                Self::instances_from_tree(&tree)?
            }
            None => match lookup("MODEM_INSTANCES") {
                Some(list) => parse_instance_list(&list)?,
                None => {
                    warn!("Neither MODEM_CONFIG_FILE nor MODEM_INSTANCES set, no modems configured");
                    Vec::new()
                }
            },
        };

        let config = Self {
            instances,
            interval_secs: parse_or_default(
                &lookup,
                "MODEM_INTERVAL_SECS",
                DEFAULT_INTERVAL_SECS,
            ),
            fetch_timeout_secs: parse_or_default(
                &lookup,
                "MODEM_FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            ),
            keep_zero_readings: parse_or_default(&lookup, "MODEM_KEEP_ZERO", false),
            sink: match lookup("MODEM_SINK") {
                Some(raw) => raw.parse()?,
                None => SinkKind::default(),
            },
            collectd_hostname: lookup("COLLECTD_HOSTNAME").unwrap_or_else(|| {
                warn!("COLLECTD_HOSTNAME not set, using default");
                DEFAULT_COLLECTD_HOSTNAME.to_string()
            }),
        };

        if !config.is_configured() {
            warn!("Collector not fully configured - no modem instances");
        }

        Ok(config)
    }

    /// Adapts the host's raw module blocks into typed instances. Each block
    /// needs a `hostname`; `modem_name` (or `name`) defaults to the hostname.
    pub fn instances_from_tree(
        nodes: &[ConfigNode],
    ) -> Result<Vec<ModemInstanceConfig>, ConfigError> {
        nodes
            .iter()
            .map(|node| {
                let hostname = node.child_value("hostname").ok_or_else(|| {
                    ConfigError::MissingKey {
                        block: node.key.clone(),
                        key: "hostname".to_string(),
                    }
                })?;
                let name = node
                    .child_value("modem_name")
                    .or_else(|| node.child_value("name"))
                    .unwrap_or_else(|| hostname.clone());

                info!("Added config for modem {} at {}", name, hostname);
                Ok(ModemInstanceConfig::new(name, hostname))
            })
            .collect()
    }

    pub fn is_configured(&self) -> bool {
        !self.instances.is_empty()
    }
}

pub fn load_config_tree(path: impl AsRef<Path>) -> Result<Vec<ConfigNode>, ConfigError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Parses `name@hostname,name@hostname`. A bare entry is both name and host.
pub fn parse_instance_list(list: &str) -> Result<Vec<ModemInstanceConfig>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, host) = match entry.split_once('@') {
                Some((name, host)) => (name.trim(), host.trim()),
                None => (entry, entry),
            };
            if host.is_empty() {
                return Err(ConfigError::Invalid(format!("no hostname in '{}'", entry)));
            }
            let name = if name.is_empty() { host } else { name };
            Ok(ModemInstanceConfig::new(name, host))
        })
        .collect()
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        None => default,
    }
}
