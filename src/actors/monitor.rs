//! HealthMonitorActor - periodic health checks and alert fan-out
//!
//! One actor owns the whole check pipeline: fetch readings from the
//! providers, evaluate them against thresholds, and fan resulting alert
//! events out to every registered chat. Keeping evaluation inside a single
//! task means alert state needs no locking and two checks can never
//! interleave, no matter how many TickNow commands arrive at once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tracing::{debug, error, instrument, trace, warn};

use crate::alerts::AlertEvent;
use crate::alerts::manager::AlertManager;
use crate::config::{MonitorConfig, ThresholdConfig};
use crate::notify::Notifier;
use crate::providers::MetricsProvider;
use crate::{ChatId, MetricReading};

use super::messages::{MonitorCommand, TickReport};

/// Actor that runs the periodic health check loop
pub struct HealthMonitorActor {
    /// Where readings come from
    provider: Arc<dyn MetricsProvider>,

    /// Where alert events go
    notifier: Arc<dyn Notifier>,

    /// Alert lifecycle state, owned exclusively by this actor
    alerts: AlertManager,

    /// Thresholds by metric key
    thresholds: HashMap<String, ThresholdConfig>,

    /// Chats receiving notifications
    recipients: HashSet<ChatId>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<MonitorCommand>,

    interval_duration: Duration,
    fetch_timeout: Duration,
    dispatch_timeout: Duration,

    /// While muted, events are produced and counted but not delivered
    muted: bool,
}

impl HealthMonitorActor {
    pub fn new(
        config: &MonitorConfig,
        thresholds: Vec<ThresholdConfig>,
        recipients: Vec<ChatId>,
        provider: Arc<dyn MetricsProvider>,
        notifier: Arc<dyn Notifier>,
        command_rx: mpsc::Receiver<MonitorCommand>,
    ) -> Self {
        Self {
            provider,
            notifier,
            alerts: AlertManager::new(config.cooldown_seconds),
            thresholds: thresholds
                .into_iter()
                .map(|t| (t.metric_key.clone(), t))
                .collect(),
            recipients: recipients.into_iter().collect(),
            command_rx,
            interval_duration: Duration::from_secs(config.check_interval_seconds),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_seconds),
            dispatch_timeout: Duration::from_secs(config.dispatch_timeout_seconds),
            muted: false,
        }
    }

    /// Run the actor's main loop
    ///
    /// The first scheduled check fires one full interval after startup;
    /// checks that would overlap a slow one are skipped, not queued. Runs
    /// until a Shutdown command arrives or the command channel closes.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting health monitor actor");

        let mut ticker = interval_at(
            Instant::now() + self.interval_duration,
            self.interval_duration,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    trace!("scheduled check done: {report:?}");
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        MonitorCommand::TickNow { respond_to } => {
                            debug!("received TickNow command");
                            let report = self.tick().await;
                            let _ = respond_to.send(report);
                        }

                        MonitorCommand::Register { chat } => {
                            if self.recipients.insert(chat) {
                                debug!("registered chat {chat} for notifications");
                            }
                        }

                        MonitorCommand::Unregister { chat } => {
                            if self.recipients.remove(&chat) {
                                debug!("unregistered chat {chat}");
                            }
                        }

                        MonitorCommand::ListRecipients { respond_to } => {
                            let mut recipients: Vec<_> = self.recipients.iter().copied().collect();
                            recipients.sort();
                            let _ = respond_to.send(recipients);
                        }

                        MonitorCommand::GetAlertStates { respond_to } => {
                            let _ = respond_to.send(self.alerts.snapshot());
                        }

                        MonitorCommand::GetSummary { respond_to } => {
                            let _ = respond_to.send(self.alerts.summary());
                        }

                        MonitorCommand::Mute => {
                            debug!("muting notifications");
                            self.muted = true;
                        }

                        MonitorCommand::Unmute => {
                            debug!("unmuting notifications");
                            self.muted = false;
                        }

                        MonitorCommand::Shutdown { respond_to } => {
                            debug!("received shutdown command");
                            let _ = respond_to.send(());
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("health monitor actor stopped");
    }

    /// Run one health check: fetch, evaluate, fan out.
    ///
    /// Failures are contained at the smallest scope. A source that is down
    /// costs only its readings for this check, a bad reading is skipped,
    /// and a failed delivery affects one recipient. The check itself never
    /// errors.
    #[instrument(skip(self))]
    async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let mut readings: Vec<MetricReading> = Vec::new();

        match timeout(self.fetch_timeout, self.provider.host_readings()).await {
            Ok(Ok(batch)) => readings.extend(batch),
            Ok(Err(err)) => {
                warn!("host readings unavailable: {err}");
                report.failed_sources += 1;
            }
            Err(_) => {
                warn!("host readings timed out after {:?}", self.fetch_timeout);
                report.failed_sources += 1;
            }
        }

        match timeout(self.fetch_timeout, self.provider.container_readings()).await {
            Ok(Ok(batch)) => readings.extend(batch),
            Ok(Err(err)) => {
                warn!("container readings unavailable: {err}");
                report.failed_sources += 1;
            }
            Err(_) => {
                warn!("container readings timed out after {:?}", self.fetch_timeout);
                report.failed_sources += 1;
            }
        }

        let mut events = Vec::new();
        for reading in &readings {
            let Some(config) = Self::threshold_for(&self.thresholds, &reading.key) else {
                trace!("no threshold for {}, ignoring", reading.key);
                continue;
            };

            report.evaluated += 1;
            match self.alerts.evaluate(reading, config) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(err) => warn!("skipping reading: {err}"),
            }
        }

        report.events = events.len();

        if events.is_empty() {
            return report;
        }
        if self.muted {
            debug!("muted, dropping {} events", events.len());
            return report;
        }

        report.failed_dispatches = self.broadcast(&events).await;
        report
    }

    /// Threshold lookup with a fallback for structured keys.
    ///
    /// `container:web:cpu` falls back to the `cpu` threshold when no
    /// container-specific entry exists, and `disk:/var` falls back to
    /// `disk`. An exact match always wins.
    fn threshold_for<'a>(
        thresholds: &'a HashMap<String, ThresholdConfig>,
        key: &str,
    ) -> Option<&'a ThresholdConfig> {
        if let Some(config) = thresholds.get(key) {
            return Some(config);
        }

        if let Some((_, kind)) = key.rsplit_once(':') {
            if let Some(config) = thresholds.get(kind) {
                return Some(config);
            }
        }

        if let Some((kind, _)) = key.split_once(':') {
            return thresholds.get(kind);
        }

        None
    }

    /// Deliver every event to every registered chat concurrently.
    ///
    /// Returns the number of failed deliveries.
    async fn broadcast(&self, events: &[AlertEvent]) -> usize {
        let mut deliveries = Vec::with_capacity(events.len() * self.recipients.len());
        for event in events {
            for chat in &self.recipients {
                deliveries.push(self.send_one(*chat, event));
            }
        }

        join_all(deliveries)
            .await
            .into_iter()
            .filter(|delivered| !*delivered)
            .count()
    }

    /// One delivery, bounded by the dispatch timeout. Returns whether it
    /// succeeded.
    async fn send_one(&self, chat: ChatId, event: &AlertEvent) -> bool {
        let sent = timeout(
            self.dispatch_timeout,
            self.notifier.on_alert_event(chat, event),
        )
        .await;

        match sent {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                error!("{err}");
                false
            }
            Err(_) => {
                error!(
                    "dispatch to chat {chat} timed out after {:?}",
                    self.dispatch_timeout
                );
                false
            }
        }
    }
}

/// Handle for controlling a HealthMonitorActor
///
/// Cloneable; all clones talk to the same actor.
#[derive(Clone)]
pub struct MonitorHandle {
    /// Command sender
    sender: mpsc::Sender<MonitorCommand>,
}

impl MonitorHandle {
    /// Spawn the monitor actor as a tokio task and return a handle to it.
    pub fn spawn(
        config: &MonitorConfig,
        thresholds: Vec<ThresholdConfig>,
        recipients: Vec<ChatId>,
        provider: Arc<dyn MetricsProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor =
            HealthMonitorActor::new(config, thresholds, recipients, provider, notifier, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Run a health check immediately and wait for its report.
    pub async fn tick_now(&self) -> Result<TickReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::TickNow { respond_to: tx })
            .await
            .context("failed to send TickNow command")?;

        rx.await.context("failed to receive tick report")
    }

    /// Add a chat to the notification fan-out.
    pub async fn register(&self, chat: ChatId) -> Result<()> {
        self.sender
            .send(MonitorCommand::Register { chat })
            .await
            .context("failed to send Register command")?;
        Ok(())
    }

    /// Remove a chat from the notification fan-out.
    pub async fn unregister(&self, chat: ChatId) -> Result<()> {
        self.sender
            .send(MonitorCommand::Unregister { chat })
            .await
            .context("failed to send Unregister command")?;
        Ok(())
    }

    /// Chats currently receiving notifications, sorted.
    pub async fn list_recipients(&self) -> Result<Vec<ChatId>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::ListRecipients { respond_to: tx })
            .await
            .context("failed to send ListRecipients command")?;

        rx.await.context("failed to receive recipients")
    }

    /// Snapshot of all alert states, sorted by metric key.
    pub async fn alert_states(&self) -> Result<Vec<crate::alerts::AlertStateSnapshot>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::GetAlertStates { respond_to: tx })
            .await
            .context("failed to send GetAlertStates command")?;

        rx.await.context("failed to receive alert states")
    }

    /// Aggregate counts of active alerts by severity.
    pub async fn summary(&self) -> Result<crate::alerts::AlertSummary> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::GetSummary { respond_to: tx })
            .await
            .context("failed to send GetSummary command")?;

        rx.await.context("failed to receive summary")
    }

    /// Suppress notification delivery (checks keep running).
    pub async fn mute(&self) -> Result<()> {
        self.sender
            .send(MonitorCommand::Mute)
            .await
            .context("failed to send Mute command")?;
        Ok(())
    }

    /// Resume notification delivery.
    pub async fn unmute(&self) -> Result<()> {
        self.sender
            .send(MonitorCommand::Unmute)
            .await
            .context("failed to send Unmute command")?;
        Ok(())
    }

    /// Gracefully shut down the monitor, waiting for in-flight work.
    pub async fn stop(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::Shutdown { respond_to: tx })
            .await
            .context("failed to send Shutdown command")?;

        rx.await.context("failed to receive shutdown ack")?;
        Ok(())
    }
}
