use crate::MetricReading;
use crate::config::ThresholdConfig;

use super::Severity;

/// Classification of a single reading against one threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdDecision {
    pub in_breach: bool,
    pub severity: Severity,
}

impl ThresholdDecision {
    /// Classify `reading` against `config`.
    ///
    /// A reading is in breach iff its value is at or above the limit. The
    /// severity is the highest band whose lower bound the value reaches,
    /// so a value exactly on a band boundary gets that band. Readings in
    /// breach without a matching band default to [`Severity::Info`].
    ///
    /// Pure and deterministic, no side effects.
    pub fn evaluate(reading: &MetricReading, config: &ThresholdConfig) -> ThresholdDecision {
        let in_breach = reading.value >= config.limit;

        // Bands are validated to be ascending, so the last match is the
        // highest one.
        let severity = config
            .severity_bands
            .iter()
            .rev()
            .find(|band| band.lower_bound <= reading.value)
            .map(|band| band.level)
            .unwrap_or(Severity::Info);

        ThresholdDecision { in_breach, severity }
    }
}
