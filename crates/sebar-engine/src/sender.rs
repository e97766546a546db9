// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Circuit-breaker-wrapped send with transient-failure retry.
//!
//! Each attempt goes through the channel's breaker. Transient failures retry
//! with exponential backoff (1s, 2s, 4s). Rate-limit and ban-class errors are
//! policy signals for the worker, not retryable conditions, so they surface
//! immediately; an open breaker surfaces as a transient channel error.

use std::sync::Arc;
use std::time::Duration;

use sebar_core::{ChannelGateway, SebarError};
use sebar_resilience::{BreakerError, BreakerRegistry};
use tracing::warn;

pub struct MessageSender {
    gateway: Arc<dyn ChannelGateway>,
    breakers: BreakerRegistry,
    max_attempts: u32,
}

impl MessageSender {
    pub fn new(gateway: Arc<dyn ChannelGateway>, breakers: BreakerRegistry, max_attempts: u32) -> Self {
        Self {
            gateway,
            breakers,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Deliver `text` to `phone` over `channel`.
    pub async fn send(&self, phone: &str, text: &str, channel: &str) -> Result<(), SebarError> {
        let breaker = self.breakers.get(channel);
        let mut attempt = 0u32;
        loop {
            let result = breaker
                .call(|| self.gateway.send_text(phone, text, channel))
                .await;
            let err = match result {
                Ok(()) => return Ok(()),
                Err(BreakerError::Open { resource, retry_in }) => {
                    return Err(SebarError::Channel {
                        message: format!(
                            "channel '{resource}' circuit open, retry in {retry_in:?}"
                        ),
                        source: None,
                    });
                }
                Err(BreakerError::Inner(e)) => e,
            };

            if err.is_rate_limited() || err.is_ban() {
                return Err(err);
            }

            attempt += 1;
            if attempt >= self.max_attempts {
                return Err(err);
            }
            let backoff = Duration::from_secs(1 << (attempt - 1));
            warn!(
                phone,
                attempt,
                max_attempts = self.max_attempts,
                backoff_secs = backoff.as_secs(),
                error = %err,
                "send failed, retrying"
            );
            tokio::time::sleep(backoff).await;
        }
    }
}
