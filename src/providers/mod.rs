//! Metric sources
//!
//! [`system`] samples the local host with sysinfo and [`docker`] queries the
//! Docker engine HTTP API. [`CompositeProvider`] puts both behind one seam so
//! the monitor does not care where readings come from.

pub mod docker;
pub mod system;

use async_trait::async_trait;

use crate::MetricReading;
use crate::error::MonitorResult;

/// Source of metric readings for one health check.
///
/// Host and container readings are fetched separately so a failure on one
/// side does not take the other down with it.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn host_readings(&self) -> MonitorResult<Vec<MetricReading>>;

    async fn container_readings(&self) -> MonitorResult<Vec<MetricReading>>;
}

/// Combines the host sampler with an optional docker source.
pub struct CompositeProvider {
    system: system::SystemProvider,
    docker: Option<docker::DockerProvider>,
}

impl CompositeProvider {
    pub fn new(system: system::SystemProvider, docker: Option<docker::DockerProvider>) -> Self {
        Self { system, docker }
    }
}

#[async_trait]
impl MetricsProvider for CompositeProvider {
    async fn host_readings(&self) -> MonitorResult<Vec<MetricReading>> {
        self.system.sample().await
    }

    async fn container_readings(&self) -> MonitorResult<Vec<MetricReading>> {
        match &self.docker {
            Some(docker) => docker.sample().await,
            None => Ok(Vec::new()),
        }
    }
}
