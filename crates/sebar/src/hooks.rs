// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default collaborator implementations shipped with the binary.
//!
//! The engine's hook traits are integration points for a larger deployment
//! (CRM segments, opt-out registries). Standalone, the binary wires in these
//! minimal implementations; operators embed the engine crates directly when
//! they need real ones.

use std::sync::Arc;

use async_trait::async_trait;
use sebar_core::{Blacklist, ChannelGateway, Notifier, Recipient, SebarError, SegmentResolver};
use tracing::info;

/// Opt-out list that blocks nobody. Standalone deployments manage opt-outs
/// upstream, before targets reach the engine.
pub struct AllowAll;

#[async_trait]
impl Blacklist for AllowAll {
    async fn is_blacklisted(&self, _phone: &str) -> Result<bool, SebarError> {
        Ok(false)
    }
}

/// Segment resolver for deployments without a CRM: every named segment is
/// unknown, so schedules targeting one fail visibly instead of firing empty.
pub struct NoSegments;

#[async_trait]
impl SegmentResolver for NoSegments {
    async fn resolve(&self, segment: &str) -> Result<Vec<Recipient>, SebarError> {
        Err(SebarError::Validation(format!(
            "no segment resolver configured, cannot resolve segment '{segment}'"
        )))
    }
}

/// Delivers operator alerts as messages through the channel gateway itself.
/// The tenant identifier doubles as the owner's phone number.
pub struct GatewayNotifier {
    gateway: Arc<dyn ChannelGateway>,
    channel: String,
}

impl GatewayNotifier {
    pub fn new(gateway: Arc<dyn ChannelGateway>, channel: impl Into<String>) -> Self {
        Self {
            gateway,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl Notifier for GatewayNotifier {
    async fn alert(&self, tenant_id: &str, message: &str) -> Result<(), SebarError> {
        info!(tenant_id, "delivering operator alert");
        self.gateway
            .send_text(tenant_id, message, &self.channel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sebar_test_utils::MockGateway;

    #[tokio::test]
    async fn allow_all_never_blocks() {
        assert!(!AllowAll.is_blacklisted("628123").await.unwrap());
    }

    #[tokio::test]
    async fn no_segments_rejects_every_name() {
        let err = NoSegments.resolve("active").await.unwrap_err();
        assert!(matches!(err, SebarError::Validation(_)));
    }

    #[tokio::test]
    async fn gateway_notifier_sends_to_tenant() {
        let gateway = Arc::new(MockGateway::new());
        let notifier = GatewayNotifier::new(gateway.clone(), "default");
        notifier.alert("628999", "campaign done").await.unwrap();

        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].phone, "628999");
        assert_eq!(sent[0].text, "campaign done");
        assert_eq!(sent[0].channel, "default");
    }
}
