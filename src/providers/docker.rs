//! Container metrics via the Docker engine HTTP API
//!
//! Talks plain HTTP to the engine (`/containers/json` for discovery,
//! `/containers/{id}/stats?stream=false` for a one-shot stats snapshot).
//! Only containers named in the configuration are sampled.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, instrument, trace, warn};

use crate::MetricReading;
use crate::config::DockerConfig;
use crate::error::{MonitorError, MonitorResult};

/// Reads cpu and memory usage for the configured containers.
pub struct DockerProvider {
    /// HTTP client (reused across requests)
    client: reqwest::Client,
    endpoint: String,
    containers: Vec<String>,
}

impl DockerProvider {
    pub fn new(config: &DockerConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .expect("Failed to build HTTP client"),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            containers: config.containers.clone(),
        }
    }

    /// One stats sample per configured running container.
    ///
    /// A container that is missing, stopped, or fails its stats request is
    /// skipped with a log line; only a failure to list containers at all is
    /// reported as an error.
    #[instrument(skip(self))]
    pub async fn sample(&self) -> MonitorResult<Vec<MetricReading>> {
        let summaries = self.list_containers().await?;
        let timestamp = Utc::now();
        let mut readings = Vec::new();

        for name in &self.containers {
            let Some(summary) = summaries.iter().find(|s| s.has_name(name)) else {
                debug!("container {name} not present, skipping");
                continue;
            };
            if summary.state != "running" {
                debug!("container {name} is {}, skipping stats", summary.state);
                continue;
            }

            let stats = match self.container_stats(&summary.id).await {
                Ok(stats) => stats,
                Err(err) => {
                    warn!("failed to read stats for container {name}: {err}");
                    continue;
                }
            };

            readings.push(MetricReading::percent(
                format!("container:{name}:cpu"),
                stats.cpu_percent(),
                timestamp,
            ));
            readings.push(MetricReading::percent(
                format!("container:{name}:memory"),
                stats.memory_percent(),
                timestamp,
            ));
        }

        trace!("sampled {} container readings", readings.len());
        Ok(readings)
    }

    async fn list_containers(&self) -> MonitorResult<Vec<ContainerSummary>> {
        let url = format!("{}/containers/json?all=true", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| source_unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(source_unavailable(format!("HTTP {}", response.status())));
        }

        response
            .json::<Vec<ContainerSummary>>()
            .await
            .map_err(|err| source_unavailable(err.to_string()))
    }

    async fn container_stats(&self, id: &str) -> MonitorResult<ContainerStats> {
        let url = format!("{}/containers/{}/stats?stream=false", self.endpoint, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| source_unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(source_unavailable(format!("HTTP {}", response.status())));
        }

        response
            .json::<ContainerStats>()
            .await
            .map_err(|err| source_unavailable(err.to_string()))
    }
}

fn source_unavailable(reason: String) -> MonitorError {
    MonitorError::SourceUnavailable {
        source: "docker".to_string(),
        reason,
    }
}

#[derive(Debug, Deserialize)]
struct ContainerSummary {
    #[serde(rename = "Id")]
    id: String,

    #[serde(rename = "Names", default)]
    names: Vec<String>,

    #[serde(rename = "State", default)]
    state: String,
}

impl ContainerSummary {
    /// The engine prefixes names with a slash.
    fn has_name(&self, name: &str) -> bool {
        self.names
            .iter()
            .any(|candidate| candidate.trim_start_matches('/') == name)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ContainerStats {
    #[serde(default)]
    cpu_stats: CpuStats,

    #[serde(default)]
    precpu_stats: CpuStats,

    #[serde(default)]
    memory_stats: MemoryStats,
}

#[derive(Debug, Default, Deserialize)]
struct CpuStats {
    #[serde(default)]
    cpu_usage: CpuUsage,
    system_cpu_usage: Option<u64>,
    online_cpus: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct CpuUsage {
    #[serde(default)]
    total_usage: u64,
    percpu_usage: Option<Vec<u64>>,
}

#[derive(Debug, Default, Deserialize)]
struct MemoryStats {
    usage: Option<u64>,
    limit: Option<u64>,
}

impl ContainerStats {
    /// CPU percentage the way `docker stats` computes it: usage delta over
    /// system delta, scaled by the number of cpus.
    fn cpu_percent(&self) -> f64 {
        let cpu_delta = self
            .cpu_stats
            .cpu_usage
            .total_usage
            .saturating_sub(self.precpu_stats.cpu_usage.total_usage);
        let system_delta = self
            .cpu_stats
            .system_cpu_usage
            .unwrap_or(0)
            .saturating_sub(self.precpu_stats.system_cpu_usage.unwrap_or(0));

        if cpu_delta == 0 || system_delta == 0 {
            return 0.0;
        }

        let num_cpus = self
            .cpu_stats
            .cpu_usage
            .percpu_usage
            .as_ref()
            .map(|cpus| cpus.len())
            .filter(|len| *len > 0)
            .or_else(|| self.cpu_stats.online_cpus.map(|n| n as usize))
            .unwrap_or(1);

        cpu_delta as f64 / system_delta as f64 * num_cpus as f64 * 100.0
    }

    fn memory_percent(&self) -> f64 {
        let usage = self.memory_stats.usage.unwrap_or(0);
        let limit = self.memory_stats.limit.unwrap_or(0);
        if limit == 0 {
            return 0.0;
        }
        usage as f64 / limit as f64 * 100.0
    }
}
