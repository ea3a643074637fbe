//! Command admission
//!
//! Chat commands pass an ordered chain of checks before they reach a
//! handler: the allow-list first, then the rate limiter. The first denial
//! wins and later checks never run, so an unauthorized user does not
//! consume rate limit budget.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::UserId;
use crate::limiter::RateLimiter;

/// Verdict of a single admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Allow,
    Deny {
        /// Name of the check that denied
        check: &'static str,
        /// Reason suitable for echoing back to the user
        reason: String,
    },
}

/// An incoming chat command, reduced to what admission needs.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub user: UserId,
    pub command: String,
}

/// One gate in the admission chain.
#[async_trait]
pub trait CommandCheck: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, request: &CommandRequest) -> CheckOutcome;
}

/// Ordered chain of checks applied to every command.
#[derive(Default)]
pub struct CommandPipeline {
    checks: Vec<Box<dyn CommandCheck>>,
}

impl CommandPipeline {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn with_check(mut self, check: impl CommandCheck + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Runs the checks in order; the first denial short-circuits.
    pub async fn admit(&self, request: &CommandRequest) -> CheckOutcome {
        for check in &self.checks {
            match check.check(request).await {
                CheckOutcome::Allow => {
                    debug!("check {} passed for user {}", check.name(), request.user);
                }
                deny @ CheckOutcome::Deny { .. } => {
                    warn!(
                        "command {} from user {} denied by {}",
                        request.command,
                        request.user,
                        check.name()
                    );
                    return deny;
                }
            }
        }

        CheckOutcome::Allow
    }
}

/// Denies users that are not on the allow-list.
pub struct AllowListCheck {
    allowed: HashSet<UserId>,
}

impl AllowListCheck {
    pub fn new(allowed: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

#[async_trait]
impl CommandCheck for AllowListCheck {
    fn name(&self) -> &'static str {
        "allow_list"
    }

    async fn check(&self, request: &CommandRequest) -> CheckOutcome {
        if self.allowed.contains(&request.user) {
            CheckOutcome::Allow
        } else {
            CheckOutcome::Deny {
                check: self.name(),
                reason: "user is not authorized".to_string(),
            }
        }
    }
}

/// Denies users that exhausted their command budget for the period.
pub struct RateLimitCheck {
    limiter: Arc<RateLimiter>,
}

impl RateLimitCheck {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl CommandCheck for RateLimitCheck {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn check(&self, request: &CommandRequest) -> CheckOutcome {
        if self.limiter.allow(request.user).await {
            CheckOutcome::Allow
        } else {
            CheckOutcome::Deny {
                check: self.name(),
                reason: "too many commands, please slow down".to_string(),
            }
        }
    }
}
