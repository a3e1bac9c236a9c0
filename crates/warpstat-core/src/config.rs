//! warpstat.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub provider: ProviderConfig,
    pub poll: PollConfig,
    pub server: ServerConfig,
}

/// Where the monitored process answers stats requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Connection target, `host:port`.
    pub address: String,
    pub stats_path: String,
    pub topology_path: String,
    pub connect_path: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:28017".to_string(),
            stats_path: "/serverStatus".to_string(),
            topology_path: "/replSetGetStatus".to_string(),
            connect_path: "/ping".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval: String,
    /// Upper bound for every provider call.
    pub timeout: String,
    /// How long shutdown waits for an in-flight cycle.
    pub shutdown_grace: String,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: "5s".to_string(),
            timeout: "2s".to_string(),
            shutdown_grace: "5s".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Prefix for every exported metric name.
    pub namespace: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9216,
            namespace: "mongodb".to_string(),
        }
    }
}

/// Poll timings resolved from their string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(2),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl ExporterConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Resolve the poll durations.
    pub fn poll_settings(&self) -> Result<PollSettings, ConfigError> {
        Ok(PollSettings {
            interval: field_duration("poll.interval", &self.poll.interval)?,
            timeout: field_duration("poll.timeout", &self.poll.timeout)?,
            shutdown_grace: field_duration("poll.shutdown_grace", &self.poll.shutdown_grace)?,
        })
    }

    /// Check the config for values the exporter cannot run with.
    pub fn validate(&self) -> Result<PollSettings, ConfigError> {
        if self.provider.address.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.address is empty".to_string()));
        }
        for (name, path) in [
            ("provider.stats_path", &self.provider.stats_path),
            ("provider.topology_path", &self.provider.topology_path),
            ("provider.connect_path", &self.provider.connect_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!("{name} must start with '/'")));
            }
        }
        if !is_metric_name(&self.server.namespace) {
            return Err(ConfigError::Invalid(format!(
                "server.namespace {:?} is not a valid metric name prefix",
                self.server.namespace
            )));
        }

        let settings = self.poll_settings()?;
        if settings.interval.is_zero() {
            return Err(ConfigError::Invalid("poll.interval must be non-zero".to_string()));
        }
        if settings.timeout.is_zero() {
            return Err(ConfigError::Invalid("poll.timeout must be non-zero".to_string()));
        }
        if settings.timeout >= settings.interval {
            return Err(ConfigError::Invalid(format!(
                "poll.timeout ({}) must be shorter than poll.interval ({})",
                self.poll.timeout, self.poll.interval
            )));
        }
        Ok(settings)
    }
}

fn field_duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value)
        .ok_or_else(|| ConfigError::Invalid(format!("{field}: cannot parse duration {value:?}")))
}

/// Parse `500ms`, `5s`, `2m`, or a bare number of seconds.
///
/// Values whose minute count would overflow are rejected.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(millis) = s.strip_suffix("ms") {
        return millis.parse().ok().map(Duration::from_millis);
    }
    if let Some(secs) = s.strip_suffix('s') {
        return secs.parse().ok().map(Duration::from_secs);
    }
    if let Some(mins) = s.strip_suffix('m') {
        let mins: u64 = mins.parse().ok()?;
        return mins.checked_mul(60).map(Duration::from_secs);
    }
    s.parse().ok().map(Duration::from_secs)
}

fn is_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
