// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded-retry publishing.
//!
//! Delivery is "at most N attempts while connected". There is no outbound
//! queue: a caller that needs a command delivered re-issues it after the
//! connection comes back.

use std::sync::Arc;
use std::time::Duration;

use pv_core::OutboundCommand;
use serde::{Deserialize, Serialize};

use super::supervisor::{ConnectionState, ConnectionSupervisor};
use super::timer::Sleeper;
use super::transport::{Frame, Transport, TransportError};

/// Failure category of a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishFailureKind {
    /// The link was not connected. Never retried.
    NotConnected,
    /// Every attempt failed.
    MaxRetriesExceeded,
    /// The session shut down during a retry wait.
    Cancelled,
    /// The command could not be serialized.
    Encoding,
}

/// Error type for publish operations.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Link not connected.
    #[error("not connected (connection is {state})")]
    NotConnected { state: ConnectionState },

    /// Retry budget used up.
    #[error("send failed after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: TransportError },

    /// Session shut down while waiting to retry.
    #[error("publish cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    /// Serialization error.
    #[error("cannot encode command: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl PublishError {
    /// Failure category.
    pub fn kind(&self) -> PublishFailureKind {
        match self {
            PublishError::NotConnected { .. } => PublishFailureKind::NotConnected,
            PublishError::MaxRetriesExceeded { .. } => PublishFailureKind::MaxRetriesExceeded,
            PublishError::Cancelled { .. } => PublishFailureKind::Cancelled,
            PublishError::Encoding(_) => PublishFailureKind::Encoding,
        }
    }

    /// The last transport error, when attempts were made.
    pub fn last_error(&self) -> Option<&TransportError> {
        match self {
            PublishError::MaxRetriesExceeded { last_error, .. } => Some(last_error),
            _ => None,
        }
    }
}

/// Publish retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishPolicy {
    /// Sends attempted before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wait after the first failure; doubles after each further one.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    250
}

impl Default for PublishPolicy {
    fn default() -> Self {
        PublishPolicy { max_attempts: default_max_attempts(), base_delay_ms: default_base_delay_ms() }
    }
}

impl PublishPolicy {
    /// Wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.max(1).saturating_sub(1).min(31);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << shift))
    }
}

/// Sends frames over a supervised link with bounded retry.
pub struct ReliablePublisher {
    policy: PublishPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl ReliablePublisher {
    /// Create a publisher.
    pub fn new(policy: PublishPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        ReliablePublisher { policy, sleeper }
    }

    /// The retry settings in force.
    pub fn policy(&self) -> PublishPolicy {
        self.policy
    }

    /// Send `frame`, retrying transient failures.
    ///
    /// Fails with `NotConnected` immediately, without waiting, when the link
    /// is not connected, including when a failed attempt took the link down.
    /// Session shutdown during a retry wait ends the loop with `Cancelled`.
    pub async fn publish<T: Transport>(
        &self,
        link: &mut ConnectionSupervisor<T>,
        frame: Frame,
    ) -> Result<(), PublishError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let shutdown = link.shutdown_token();
        let mut attempt = 0;

        loop {
            let state = link.state();
            if !state.is_connected() {
                return Err(PublishError::NotConnected { state });
            }

            attempt += 1;
            let last_error = match link.send(frame.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            tracing::warn!("send attempt {}/{} failed: {}", attempt, max_attempts, last_error);

            if attempt >= max_attempts {
                return Err(PublishError::MaxRetriesExceeded { attempts: attempt, last_error });
            }
            if !link.state().is_connected() {
                continue;
            }

            let delay = self.policy.delay_after(attempt);
            let cancelled = tokio::select! {
                _ = shutdown.cancelled() => true,
                _ = self.sleeper.sleep(delay) => false,
            };
            if cancelled {
                return Err(PublishError::Cancelled { attempts: attempt });
            }
        }
    }

    /// Encode and publish a command.
    pub async fn publish_command<T: Transport>(
        &self,
        link: &mut ConnectionSupervisor<T>,
        command: &OutboundCommand,
    ) -> Result<(), PublishError> {
        let json = command.to_json()?;
        tracing::debug!("publishing {}", command.kind());
        self.publish(link, Frame::text(json)).await
    }
}

#[cfg(test)]
#[path = "publisher_tests.rs"]
mod tests;
