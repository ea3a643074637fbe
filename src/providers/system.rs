//! Host metrics via sysinfo

use chrono::Utc;
use sysinfo::{Disks, System};
use tracing::{instrument, trace, warn};

use crate::MetricReading;
use crate::error::MonitorResult;

/// Samples cpu, memory and disk usage of the local host.
pub struct SystemProvider {
    /// Mount points to report disk usage for
    mounts: Vec<String>,
}

impl SystemProvider {
    pub fn new(mounts: Vec<String>) -> Self {
        Self { mounts }
    }

    /// Takes one sample of the host.
    ///
    /// CPU usage needs two refreshes with a short pause in between, so a
    /// sample takes at least [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`].
    #[instrument(skip(self))]
    pub async fn sample(&self) -> MonitorResult<Vec<MetricReading>> {
        let mut sys = System::new_all();
        sys.refresh_all();
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        sys.refresh_all();

        let timestamp = Utc::now();
        let mut readings = Vec::new();

        let cpus = sys.cpus();
        if !cpus.is_empty() {
            let usage_sum = cpus.iter().map(|cpu| cpu.cpu_usage() as f64).sum::<f64>();
            readings.push(MetricReading::percent(
                "cpu",
                usage_sum / cpus.len() as f64,
                timestamp,
            ));
        }

        let total_memory = sys.total_memory();
        if total_memory > 0 {
            let used = sys.used_memory() as f64 / total_memory as f64 * 100.0;
            readings.push(MetricReading::percent("memory", used, timestamp));
        }

        let disks = Disks::new_with_refreshed_list();
        for mount in &self.mounts {
            let found = disks
                .list()
                .iter()
                .find(|disk| disk.mount_point().to_str() == Some(mount.as_str()));
            let Some(disk) = found else {
                warn!("mount point {mount} not found, skipping");
                continue;
            };

            let total = disk.total_space();
            if total == 0 {
                continue;
            }
            let used = (total - disk.available_space()) as f64 / total as f64 * 100.0;
            readings.push(MetricReading::percent(disk_key(mount), used, timestamp));
        }

        trace!("sampled {} host readings", readings.len());
        Ok(readings)
    }
}

/// The root mount keeps the plain `disk` key so the default threshold
/// applies; any other mount gets a `disk:<mount>` key of its own.
fn disk_key(mount: &str) -> String {
    if mount == "/" {
        "disk".to_string()
    } else {
        format!("disk:{mount}")
    }
}
