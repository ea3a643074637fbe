//! Threshold alerting
//!
//! [`threshold`] classifies a single reading against its configured limit
//! and severity bands. [`manager`] owns the per-key alert lifecycle on top
//! of that: raise, escalate, clear, and cooldown suppression in between.

pub mod manager;
pub mod threshold;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity tier of an alert, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        };
        write!(f, "{label}")
    }
}

/// Lifecycle step an alert event represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertTransition {
    /// A metric entered breach, or a still-active alert is re-announced
    /// after the cooldown elapsed
    Raised,

    /// The severity of a still-active alert increased
    Escalated,

    /// A previously active metric dropped back below its limit
    Cleared,
}

/// Notification event emitted by the alert manager
///
/// Immutable once created. The monitor fans each event out to every
/// registered recipient and does not retain it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub metric_key: String,
    pub severity: Severity,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub transition: AlertTransition,
}

/// Point-in-time view of one metric's alert state, for on-demand queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertStateSnapshot {
    pub metric_key: String,
    pub is_active: bool,
    pub last_severity: Option<Severity>,
    pub last_notified_at: Option<DateTime<Utc>>,
}

/// Count of currently active alerts per severity tier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub active_total: usize,
    pub active_critical: usize,
    pub active_warning: usize,
    pub active_info: usize,
}
