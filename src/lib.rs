pub mod actors;
pub mod alerts;
pub mod config;
pub mod error;
pub mod limiter;
pub mod notify;
pub mod pipeline;
pub mod providers;
pub mod window;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single sampled quantity.
///
/// Host metrics use the keys `cpu`, `memory` and `disk`. Container metrics
/// use `container:<name>:cpu` and `container:<name>:memory`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricReading {
    pub key: String,
    pub value: f64,
    pub unit: MetricUnit,
    pub timestamp: DateTime<Utc>,
}

impl MetricReading {
    /// Shorthand for the common percentage reading.
    pub fn percent(key: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value,
            unit: MetricUnit::Percent,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricUnit {
    Percent,
    Bytes,
    Celsius,
}

/// Identity of a command caller, used for rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of a chat that alert notifications are delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
