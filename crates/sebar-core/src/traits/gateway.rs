// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound channel gateway trait.

use async_trait::async_trait;

use crate::error::SebarError;
use crate::types::ChannelHealth;

/// The send/exists/health primitives the engine needs from the messaging
/// channel. Session lifecycle (registration, pairing, connectivity) is the
/// gateway implementation's concern, not the engine's.
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// Current health of the named channel/session.
    async fn health(&self, channel: &str) -> Result<ChannelHealth, SebarError>;

    /// Deliver a text message to a recipient.
    ///
    /// Implementations must surface rate-limit responses as
    /// [`SebarError::RateLimited`] and permanent ban-class rejections as
    /// [`SebarError::Banned`] so the worker can apply the right policy;
    /// everything else is a transient [`SebarError::Channel`].
    async fn send_text(
        &self,
        phone: &str,
        text: &str,
        channel: &str,
    ) -> Result<(), SebarError>;

    /// Whether the recipient exists on the channel at all.
    async fn exists(&self, phone: &str, channel: &str) -> Result<bool, SebarError>;
}
