// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory fakes for every collaborator trait the engine consumes.
//!
//! All fakes are scriptable and record what the engine did to them, so worker
//! and scheduler tests can assert on outbound traffic without a live gateway.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use sebar_core::{
    Blacklist, BroadcastContextSink, ChannelGateway, ChannelHealth, ContentProvider,
    MaintenanceHook, Notifier, Recipient, SebarError, SegmentResolver,
};

/// Scripted outcome for one send attempt.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    Success,
    Transient(String),
    RateLimited,
    Banned,
}

impl SendOutcome {
    fn into_result(self) -> Result<(), SebarError> {
        match self {
            SendOutcome::Success => Ok(()),
            SendOutcome::Transient(message) => Err(SebarError::Channel {
                message,
                source: None,
            }),
            SendOutcome::RateLimited => Err(SebarError::RateLimited {
                message: "too many requests".into(),
            }),
            SendOutcome::Banned => Err(SebarError::Banned {
                message: "sender rejected".into(),
            }),
        }
    }
}

/// One message the engine handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub phone: String,
    pub text: String,
    pub channel: String,
}

#[derive(Default)]
struct GatewayState {
    health: Option<ChannelHealth>,
    missing: HashSet<String>,
    scripts: HashMap<String, VecDeque<SendOutcome>>,
    default_outcome: Option<SendOutcome>,
    sent: Vec<SentMessage>,
    exists_checks: Vec<String>,
}

/// Scriptable [`ChannelGateway`] fake.
///
/// Per-phone outcome scripts are consumed front to back; once a script is
/// exhausted (or for unscripted phones) the default outcome applies, which is
/// `Success` unless overridden.
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<GatewayState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_health(&self, health: ChannelHealth) {
        self.state.lock().unwrap().health = Some(health);
    }

    /// Make `exists()` return false for this phone.
    pub fn mark_missing(&self, phone: &str) {
        self.state.lock().unwrap().missing.insert(phone.to_string());
    }

    /// Queue send outcomes for a specific phone, consumed in order.
    pub fn script(&self, phone: &str, outcomes: impl IntoIterator<Item = SendOutcome>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(phone.to_string())
            .or_default()
            .extend(outcomes);
    }

    /// Outcome applied when no per-phone script remains.
    pub fn set_default_outcome(&self, outcome: SendOutcome) {
        self.state.lock().unwrap().default_outcome = Some(outcome);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().unwrap().sent.len()
    }

    pub fn exists_checks(&self) -> Vec<String> {
        self.state.lock().unwrap().exists_checks.clone()
    }
}

#[async_trait]
impl ChannelGateway for MockGateway {
    async fn health(&self, _channel: &str) -> Result<ChannelHealth, SebarError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .health
            .clone()
            .unwrap_or(ChannelHealth::Working))
    }

    async fn send_text(&self, phone: &str, text: &str, channel: &str) -> Result<(), SebarError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            let outcome = state
                .scripts
                .get_mut(phone)
                .and_then(VecDeque::pop_front)
                .or_else(|| state.default_outcome.clone())
                .unwrap_or(SendOutcome::Success);
            if matches!(outcome, SendOutcome::Success) {
                state.sent.push(SentMessage {
                    phone: phone.to_string(),
                    text: text.to_string(),
                    channel: channel.to_string(),
                });
            }
            outcome
        };
        outcome.into_result()
    }

    async fn exists(&self, phone: &str, _channel: &str) -> Result<bool, SebarError> {
        let mut state = self.state.lock().unwrap();
        state.exists_checks.push(phone.to_string());
        Ok(!state.missing.contains(phone))
    }
}

/// [`Blacklist`] fake backed by a set of opted-out phones.
#[derive(Default)]
pub struct MockBlacklist {
    phones: Mutex<HashSet<String>>,
}

impl MockBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self, phone: &str) {
        self.phones.lock().unwrap().insert(phone.to_string());
    }
}

#[async_trait]
impl Blacklist for MockBlacklist {
    async fn is_blacklisted(&self, phone: &str) -> Result<bool, SebarError> {
        Ok(self.phones.lock().unwrap().contains(phone))
    }
}

/// [`SegmentResolver`] fake with pre-registered segments.
#[derive(Default)]
pub struct MockSegments {
    segments: Mutex<HashMap<String, Vec<Recipient>>>,
}

impl MockSegments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, recipients: Vec<Recipient>) {
        self.segments
            .lock()
            .unwrap()
            .insert(name.to_string(), recipients);
    }
}

#[async_trait]
impl SegmentResolver for MockSegments {
    async fn resolve(&self, segment: &str) -> Result<Vec<Recipient>, SebarError> {
        self.segments
            .lock()
            .unwrap()
            .get(segment)
            .cloned()
            .ok_or_else(|| SebarError::Validation(format!("unknown segment '{segment}'")))
    }
}

/// [`Notifier`] fake recording every alert.
#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn alert(&self, tenant_id: &str, message: &str) -> Result<(), SebarError> {
        self.alerts
            .lock()
            .unwrap()
            .push((tenant_id.to_string(), message.to_string()));
        Ok(())
    }
}

/// [`BroadcastContextSink`] fake recording per-recipient context updates.
#[derive(Default)]
pub struct RecordingContextSink {
    records: Mutex<Vec<(String, String, String)>>,
}

impl RecordingContextSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(String, String, String)> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl BroadcastContextSink for RecordingContextSink {
    async fn record_broadcast(
        &self,
        tenant_id: &str,
        phone: &str,
        message: &str,
    ) -> Result<(), SebarError> {
        self.records.lock().unwrap().push((
            tenant_id.to_string(),
            phone.to_string(),
            message.to_string(),
        ));
        Ok(())
    }
}

/// [`ContentProvider`] fake returning numbered variants so round-robin
/// selection is observable in sent text.
pub struct NumberedContent;

#[async_trait]
impl ContentProvider for NumberedContent {
    async fn variants(&self, template: &str, count: usize) -> Result<Vec<String>, SebarError> {
        Ok((0..count.max(1))
            .map(|i| format!("{template} [v{i}]"))
            .collect())
    }
}

/// [`ContentProvider`] fake that always fails, for fallback-path tests.
pub struct FailingContent;

#[async_trait]
impl ContentProvider for FailingContent {
    async fn variants(&self, _template: &str, _count: usize) -> Result<Vec<String>, SebarError> {
        Err(SebarError::Provider {
            message: "variant generation unavailable".into(),
            source: None,
        })
    }
}

/// [`MaintenanceHook`] fake counting invocations.
#[derive(Default)]
pub struct CountingMaintenance {
    runs: Mutex<u32>,
}

impl CountingMaintenance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> u32 {
        *self.runs.lock().unwrap()
    }
}

#[async_trait]
impl MaintenanceHook for CountingMaintenance {
    async fn run_daily(&self) -> Result<(), SebarError> {
        *self.runs.lock().unwrap() += 1;
        Ok(())
    }
}
