//! Helper types for integration tests

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use vigia::alerts::{AlertEvent, AlertTransition, Severity};
use vigia::config::{MonitorConfig, SeverityBand, ThresholdConfig};
use vigia::error::{MonitorError, MonitorResult};
use vigia::notify::Notifier;
use vigia::providers::MetricsProvider;
use vigia::{ChatId, MetricReading};

/// Provider that replays scripted batches, one per check.
///
/// Each check pops the next host and container batch; an exhausted script
/// keeps answering with empty batches.
pub struct ScriptedProvider {
    host: Mutex<VecDeque<MonitorResult<Vec<MetricReading>>>>,
    containers: Mutex<VecDeque<MonitorResult<Vec<MetricReading>>>>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            host: Mutex::new(VecDeque::new()),
            containers: Mutex::new(VecDeque::new()),
        })
    }

    pub fn push_host(&self, batch: MonitorResult<Vec<MetricReading>>) {
        self.host.lock().unwrap().push_back(batch);
    }

    pub fn push_containers(&self, batch: MonitorResult<Vec<MetricReading>>) {
        self.containers.lock().unwrap().push_back(batch);
    }
}

#[async_trait]
impl MetricsProvider for ScriptedProvider {
    async fn host_readings(&self) -> MonitorResult<Vec<MetricReading>> {
        self.host
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn container_readings(&self) -> MonitorResult<Vec<MetricReading>> {
        self.containers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Provider that sleeps before answering, to exercise fetch timeouts and
/// in-flight drain behavior.
pub struct SlowProvider {
    pub delay: Duration,
    pub cpu: f64,
}

impl SlowProvider {
    pub fn new(delay: Duration, cpu: f64) -> Arc<Self> {
        Arc::new(Self { delay, cpu })
    }
}

#[async_trait]
impl MetricsProvider for SlowProvider {
    async fn host_readings(&self) -> MonitorResult<Vec<MetricReading>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![MetricReading::percent("cpu", self.cpu, Utc::now())])
    }

    async fn container_readings(&self) -> MonitorResult<Vec<MetricReading>> {
        Ok(Vec::new())
    }
}

/// Notifier that records deliveries and can be told to fail for specific
/// chats or to delay every delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<(ChatId, AlertEvent)>>,
    failing: Mutex<HashSet<ChatId>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_chat(&self, chat: ChatId) {
        self.failing.lock().unwrap().insert(chat);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    /// Chats that received at least one delivery, sorted.
    pub fn chats(&self) -> Vec<ChatId> {
        let mut chats: Vec<_> = self
            .deliveries
            .lock()
            .unwrap()
            .iter()
            .map(|(chat, _)| *chat)
            .collect();
        chats.sort();
        chats.dedup();
        chats
    }

    /// Transitions delivered to one chat, in order.
    pub fn transitions_for(&self, chat: ChatId) -> Vec<AlertTransition> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .filter(|(recipient, _)| *recipient == chat)
            .map(|(_, event)| event.transition)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn on_alert_event(&self, recipient: ChatId, event: &AlertEvent) -> MonitorResult<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(&recipient) {
            return Err(MonitorError::Dispatch {
                recipient,
                reason: "injected failure".to_string(),
            });
        }

        self.deliveries
            .lock()
            .unwrap()
            .push((recipient, event.clone()));
        Ok(())
    }
}

/// Threshold with the standard warning-at-limit, critical-at-95 bands.
pub fn create_test_threshold(key: &str, limit: f64) -> ThresholdConfig {
    ThresholdConfig {
        metric_key: key.to_string(),
        limit,
        severity_bands: vec![
            SeverityBand {
                lower_bound: limit,
                level: Severity::Warning,
            },
            SeverityBand {
                lower_bound: 95.0,
                level: Severity::Critical,
            },
        ],
    }
}

/// Monitor config with a timer too slow to fire during a test, so checks
/// only happen through TickNow.
pub fn create_test_monitor_config(cooldown_seconds: u64) -> MonitorConfig {
    MonitorConfig {
        check_interval_seconds: 3600,
        cooldown_seconds,
        fetch_timeout_seconds: 1,
        dispatch_timeout_seconds: 1,
    }
}

pub fn reading(key: &str, value: f64) -> MetricReading {
    MetricReading::percent(key, value, Utc::now())
}
