//! AlertManager - per-metric alert lifecycle and cooldown policy
//!
//! One [`AlertManager`] owns the alert state for every metric key it has
//! ever seen. For each reading it decides whether a notification goes out:
//!
//! ```text
//! below limit:
//!   state inactive              -> nothing
//!   state active                -> Cleared (never suppressed)
//!
//! at or above limit:
//!   state inactive              -> Raised (first raise always notifies)
//!   state active:
//!     severity increased        -> Escalated (bypasses cooldown)
//!     cooldown elapsed          -> Raised again as a reminder
//!     otherwise                 -> nothing (suppressed)
//! ```
//!
//! The cooldown test is answered by the same sliding window primitive the
//! rate limiter uses: "was any notification for this key recorded within
//! the last `cooldown_seconds`".

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, trace};

use crate::MetricReading;
use crate::config::ThresholdConfig;
use crate::error::{MonitorError, MonitorResult};
use crate::window::SlidingWindowCounter;

use super::threshold::ThresholdDecision;
use super::{AlertEvent, AlertStateSnapshot, AlertSummary, AlertTransition, Severity};

/// Per-key alert state
///
/// Created lazily on the first evaluation of a new key and kept for the
/// lifetime of the process. Mutated only by [`AlertManager::evaluate`].
#[derive(Debug, Clone, Default)]
struct AlertState {
    is_active: bool,
    last_notified_at: Option<DateTime<Utc>>,
    last_severity: Option<Severity>,
}

impl AlertState {
    fn mark_notified(&mut self, now: DateTime<Utc>, severity: Severity) {
        // last_notified_at never moves backwards, even if a reading
        // arrives with a stale timestamp
        self.last_notified_at = Some(self.last_notified_at.map_or(now, |prev| prev.max(now)));
        self.last_severity = Some(severity);
    }

    fn mark_cleared(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.last_severity = None;
        self.last_notified_at = Some(self.last_notified_at.map_or(now, |prev| prev.max(now)));
    }
}

/// Decides, per reading, whether a notification event is emitted
///
/// The clock is taken from the reading timestamps, which makes the whole
/// lifecycle deterministic and directly testable.
#[derive(Debug)]
pub struct AlertManager {
    states: HashMap<String, AlertState>,
    notifications: SlidingWindowCounter<String>,
    cooldown_seconds: u64,
}

impl AlertManager {
    pub fn new(cooldown_seconds: u64) -> Self {
        Self {
            states: HashMap::new(),
            notifications: SlidingWindowCounter::new(),
            cooldown_seconds,
        }
    }

    /// Evaluate one reading against its threshold.
    ///
    /// Returns the event to dispatch, if any. A non-finite value is
    /// rejected before any state is touched; the caller logs and skips
    /// that metric for the tick.
    #[instrument(skip(self, reading, config), fields(key = %reading.key))]
    pub fn evaluate(
        &mut self,
        reading: &MetricReading,
        config: &ThresholdConfig,
    ) -> MonitorResult<Option<AlertEvent>> {
        if !reading.value.is_finite() {
            return Err(MonitorError::InvalidMetric {
                key: reading.key.clone(),
                value: reading.value,
            });
        }

        let now = reading.timestamp;
        let decision = ThresholdDecision::evaluate(reading, config);
        let state = self.states.entry(reading.key.clone()).or_default();

        if !decision.in_breach {
            if !state.is_active {
                return Ok(None);
            }

            // Clears always go out immediately, so recipients are never
            // left believing an alert is still ongoing.
            state.mark_cleared(now);
            debug!("{}: cleared at {:.2}", reading.key, reading.value);
            return Ok(Some(Self::event(reading, config, decision.severity, AlertTransition::Cleared)));
        }

        if !state.is_active {
            // New alert. The first raise always notifies; whether the
            // previous episode notified recently is irrelevant.
            state.is_active = true;
            state.mark_notified(now, decision.severity);
            self.notifications.record(reading.key.clone(), now);

            debug!(
                "{}: raised at {:.2} >= {} ({})",
                reading.key, reading.value, config.limit, decision.severity
            );
            return Ok(Some(Self::event(reading, config, decision.severity, AlertTransition::Raised)));
        }

        // Still in breach. Escalations bypass the cooldown, reminders wait
        // for it.
        if state.last_severity.is_some_and(|prev| decision.severity > prev) {
            state.mark_notified(now, decision.severity);
            self.notifications.record(reading.key.clone(), now);

            debug!("{}: escalated to {}", reading.key, decision.severity);
            return Ok(Some(Self::event(reading, config, decision.severity, AlertTransition::Escalated)));
        }

        let recent = self
            .notifications
            .count_in_window(&reading.key, now, self.cooldown_seconds);
        if recent == 0 {
            state.mark_notified(now, decision.severity);
            self.notifications.record(reading.key.clone(), now);

            debug!("{}: still in breach, cooldown elapsed, reminding", reading.key);
            return Ok(Some(Self::event(reading, config, decision.severity, AlertTransition::Raised)));
        }

        trace!("{}: still in breach, suppressed by cooldown", reading.key);
        Ok(None)
    }

    /// Current state of every metric key seen so far, sorted by key.
    pub fn snapshot(&self) -> Vec<AlertStateSnapshot> {
        let mut snapshots: Vec<_> = self
            .states
            .iter()
            .map(|(key, state)| AlertStateSnapshot {
                metric_key: key.clone(),
                is_active: state.is_active,
                last_severity: state.last_severity,
                last_notified_at: state.last_notified_at,
            })
            .collect();

        snapshots.sort_by(|a, b| a.metric_key.cmp(&b.metric_key));
        snapshots
    }

    /// Count of active alerts per severity tier.
    pub fn summary(&self) -> AlertSummary {
        let mut summary = AlertSummary::default();

        for state in self.states.values().filter(|state| state.is_active) {
            summary.active_total += 1;
            match state.last_severity {
                Some(Severity::Critical) => summary.active_critical += 1,
                Some(Severity::Warning) => summary.active_warning += 1,
                Some(Severity::Info) | None => summary.active_info += 1,
            }
        }

        summary
    }

    fn event(
        reading: &MetricReading,
        config: &ThresholdConfig,
        severity: Severity,
        transition: AlertTransition,
    ) -> AlertEvent {
        // A terse machine-readable summary; rendering human text is the
        // transport layer's job.
        let message = match transition {
            AlertTransition::Cleared => {
                format!("{} {:.2} below limit {}", reading.key, reading.value, config.limit)
            }
            _ => format!(
                "{} {:.2} at or above limit {} ({severity})",
                reading.key, reading.value, config.limit
            ),
        };

        AlertEvent {
            metric_key: reading.key.clone(),
            severity,
            value: reading.value,
            threshold: config.limit,
            message,
            timestamp: reading.timestamp,
            transition,
        }
    }
}
