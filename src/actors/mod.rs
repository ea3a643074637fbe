//! Actor-based monitoring
//!
//! The health monitor runs as a single async task owning all mutable alert
//! state, controlled through a command channel.
//!
//! ```text
//! Timer tick ──► fetch readings ──► evaluate thresholds ──► fan out events
//!     ▲                                                     (one request
//!     └── Commands (TickNow, Register, Mute, Shutdown, ...)  per recipient)
//! ```
//!
//! Queries (alert states, summary, recipient list) travel over the same
//! channel and answer through oneshot senders, so they can never observe a
//! check half-done.

pub mod messages;
pub mod monitor;
