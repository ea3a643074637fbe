use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;
use tracing::trace;

use crate::UserId;
use crate::alerts::Severity;

/// Result type alias for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read
    Io(std::io::Error),

    /// Config file is not valid JSON
    Parse(serde_json::Error),

    /// A field holds a value the daemon cannot run with
    Invalid { field: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "failed to read config file: {}", err),
            ConfigError::Parse(err) => write!(f, "failed to parse config file: {}", err),
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid configuration: {}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Users permitted to issue commands
    pub allowed_users: Vec<UserId>,

    /// Endpoint alert notifications are delivered to
    pub webhook: WebhookConfig,

    /// Metric thresholds (defaults cover cpu, memory and disk)
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<ThresholdConfig>,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Docker engine access (optional - container checks are skipped without it)
    pub docker: Option<DockerConfig>,

    /// Mount points to sample disk usage for
    #[serde(default = "default_disk_mounts")]
    pub disk_mounts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
}

/// Check scheduling and notification pacing
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between health checks
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,

    /// Minimum seconds between repeat notifications for the same metric
    #[serde(default = "default_cooldown")]
    pub cooldown_seconds: u64,

    /// Per-source budget for fetching readings within one check
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,

    /// Per-recipient budget for delivering one notification
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            check_interval_seconds: default_check_interval(),
            cooldown_seconds: default_cooldown(),
            fetch_timeout_seconds: default_fetch_timeout(),
            dispatch_timeout_seconds: default_dispatch_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Commands allowed per user within one period
    #[serde(default = "default_max_calls")]
    pub max_calls: usize,

    #[serde(default = "default_rate_period")]
    pub period_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            max_calls: default_max_calls(),
            period_seconds: default_rate_period(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DockerConfig {
    /// Docker engine API endpoint
    #[serde(default = "default_docker_endpoint")]
    pub endpoint: String,

    /// Container names to watch (containers not listed here are ignored)
    #[serde(default)]
    pub containers: Vec<String>,

    #[serde(default = "default_docker_timeout")]
    pub timeout_seconds: u64,
}

/// Breach limit and severity grading for one metric key
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    pub metric_key: String,

    /// Values at or above this limit are in breach
    pub limit: f64,

    /// Severity tiers by ascending lower bound; the highest band at or
    /// below the observed value wins
    #[serde(default)]
    pub severity_bands: Vec<SeverityBand>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeverityBand {
    pub lower_bound: f64,
    pub level: Severity,
}

fn default_check_interval() -> u64 {
    300
}

fn default_cooldown() -> u64 {
    600
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_dispatch_timeout() -> u64 {
    10
}

fn default_max_calls() -> usize {
    10
}

fn default_rate_period() -> u64 {
    60
}

fn default_docker_endpoint() -> String {
    "http://localhost:2375".to_string()
}

fn default_docker_timeout() -> u64 {
    10
}

fn default_disk_mounts() -> Vec<String> {
    vec!["/".to_string()]
}

fn default_bands(limit: f64) -> Vec<SeverityBand> {
    vec![
        SeverityBand {
            lower_bound: limit,
            level: Severity::Warning,
        },
        SeverityBand {
            lower_bound: 95.0,
            level: Severity::Critical,
        },
    ]
}

fn default_thresholds() -> Vec<ThresholdConfig> {
    [("cpu", 80.0), ("memory", 80.0), ("disk", 90.0)]
        .into_iter()
        .map(|(key, limit)| ThresholdConfig {
            metric_key: key.to_string(),
            limit,
            severity_bands: default_bands(limit),
        })
        .collect()
}

impl Config {
    /// Checks for values the daemon cannot run with.
    ///
    /// Called once at startup; a failure here is fatal.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.allowed_users.is_empty() {
            return Err(invalid("allowed_users", "at least one user id is required"));
        }
        if self.webhook.url.is_empty() {
            return Err(invalid("webhook.url", "must not be empty"));
        }
        if self.disk_mounts.is_empty() {
            return Err(invalid(
                "disk_mounts",
                "at least one mount point is required",
            ));
        }

        let mut seen = HashSet::new();
        for threshold in &self.thresholds {
            let field = format!("thresholds.{}", threshold.metric_key);
            if !threshold.limit.is_finite() || threshold.limit <= 0.0 {
                return Err(invalid(field, "limit must be a positive finite number"));
            }
            if !seen.insert(threshold.metric_key.as_str()) {
                return Err(invalid(field, "duplicate metric key"));
            }
            if threshold
                .severity_bands
                .iter()
                .any(|band| !band.lower_bound.is_finite())
            {
                return Err(invalid(field, "band lower bounds must be finite"));
            }
            for pair in threshold.severity_bands.windows(2) {
                if pair[1].lower_bound <= pair[0].lower_bound {
                    return Err(invalid(field, "bands must have ascending lower bounds"));
                }
                if pair[1].level <= pair[0].level {
                    return Err(invalid(field, "bands must escalate in severity"));
                }
            }
        }

        let durations = [
            (
                "monitor.check_interval_seconds",
                self.monitor.check_interval_seconds,
            ),
            ("monitor.cooldown_seconds", self.monitor.cooldown_seconds),
            (
                "monitor.fetch_timeout_seconds",
                self.monitor.fetch_timeout_seconds,
            ),
            (
                "monitor.dispatch_timeout_seconds",
                self.monitor.dispatch_timeout_seconds,
            ),
            ("rate_limit.period_seconds", self.rate_limit.period_seconds),
        ];
        for (field, value) in durations {
            if value == 0 {
                return Err(invalid(field, "must be at least 1"));
            }
        }
        if self.rate_limit.max_calls == 0 {
            return Err(invalid("rate_limit.max_calls", "must be at least 1"));
        }

        if let Some(docker) = &self.docker {
            if docker.endpoint.is_empty() {
                return Err(invalid("docker.endpoint", "must not be empty"));
            }
            if docker.timeout_seconds == 0 {
                return Err(invalid("docker.timeout_seconds", "must be at least 1"));
            }
        }

        Ok(())
    }
}

/// Reads a JSON config file and validates it.
pub fn read_config_file(path: &str) -> ConfigResult<Config> {
    let file_content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&file_content)?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}
