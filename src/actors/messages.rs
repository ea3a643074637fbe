//! Message types for actor communication
//!
//! Commands are sent to the monitor over its mpsc channel; queries carry a
//! oneshot sender for the reply.

use tokio::sync::oneshot;

use crate::ChatId;
use crate::alerts::{AlertStateSnapshot, AlertSummary};

/// Commands that can be sent to the HealthMonitorActor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Run a health check immediately (bypassing the interval timer)
    ///
    /// Used for testing and manual refresh operations.
    TickNow {
        /// Channel to send the tick report back
        respond_to: oneshot::Sender<TickReport>,
    },

    /// Add a chat to the notification fan-out
    ///
    /// Registering an already registered chat is a no-op.
    Register { chat: ChatId },

    /// Remove a chat from the notification fan-out
    Unregister { chat: ChatId },

    /// List the chats currently receiving notifications
    ListRecipients {
        respond_to: oneshot::Sender<Vec<ChatId>>,
    },

    /// Get a snapshot of all alert states, sorted by metric key
    GetAlertStates {
        respond_to: oneshot::Sender<Vec<AlertStateSnapshot>>,
    },

    /// Get aggregate counts of active alerts by severity
    GetSummary {
        respond_to: oneshot::Sender<AlertSummary>,
    },

    /// Stop delivering notifications
    ///
    /// Checks keep running and alert state keeps progressing; only the
    /// fan-out is suppressed. Useful for maintenance windows.
    Mute,

    /// Resume delivering notifications
    Unmute,

    /// Gracefully shut down the monitor
    ///
    /// Any in-flight check finishes first; the ack fires once the actor
    /// has stopped processing commands.
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// What one health check did, returned by [`MonitorCommand::TickNow`]
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Readings that were evaluated against a threshold
    pub evaluated: usize,

    /// Alert events the check produced (counted even while muted)
    pub events: usize,

    /// Notification deliveries that failed or timed out
    pub failed_dispatches: usize,

    /// Metric sources that were unavailable this check
    pub failed_sources: usize,
}
