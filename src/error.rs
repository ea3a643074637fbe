//! Error types for sampling, evaluation and dispatch

use std::fmt;

use crate::ChatId;

/// Result type alias for monitoring operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors that can occur while sampling metrics, evaluating alerts and
/// dispatching notifications
///
/// None of these are fatal. They are contained at the smallest possible
/// scope (a single reading, a single source, a single recipient), logged,
/// and never abort a tick or the scheduler.
#[derive(Debug)]
pub enum MonitorError {
    /// A reading carried a non-finite value (NaN or infinity)
    InvalidMetric { key: String, value: f64 },

    /// A metric source was unreachable for a tick
    SourceUnavailable { source: String, reason: String },

    /// A notification could not be delivered to one recipient
    Dispatch { recipient: ChatId, reason: String },
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::InvalidMetric { key, value } => {
                write!(f, "invalid reading for {}: value {} is not finite", key, value)
            }
            MonitorError::SourceUnavailable { source, reason } => {
                write!(f, "metric source {} unavailable: {}", source, reason)
            }
            MonitorError::Dispatch { recipient, reason } => {
                write!(f, "failed to dispatch alert to recipient {}: {}", recipient, reason)
            }
        }
    }
}

impl std::error::Error for MonitorError {}
