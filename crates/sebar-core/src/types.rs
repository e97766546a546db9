// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Sebar workspace.
//!
//! `BroadcastJob` and `ScheduledBroadcast` mirror the persisted record shapes;
//! the target list is a single typed record shape (phone, name, status, error)
//! from the start. Legacy representations that stored bare phone strings are
//! normalized once at ingest via [`RawTarget`], never re-checked on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Delivery state of a single recipient within a job.
///
/// Transitions are monotonic forward only:
/// `pending -> sending -> {success|failed|skipped}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    Pending,
    Sending,
    Success,
    Failed,
    Skipped,
}

impl TargetStatus {
    /// Terminal statuses are never left once entered.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TargetStatus::Success | TargetStatus::Failed | TargetStatus::Skipped
        )
    }
}

/// One recipient inside a job's target list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub phone: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_target_status")]
    pub status: TargetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_target_status() -> TargetStatus {
    TargetStatus::Pending
}

impl Target {
    /// Create a fresh pending target.
    pub fn new(phone: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            name: name.into(),
            status: TargetStatus::Pending,
            error: None,
        }
    }
}

/// Ingest shape for target lists: either a bare phone string (legacy) or a
/// full record. Converted to [`Target`] exactly once, at job-creation time.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTarget {
    Phone(String),
    Record(Target),
}

impl RawTarget {
    pub fn into_target(self) -> Target {
        match self {
            RawTarget::Phone(phone) => Target::new(phone, ""),
            RawTarget::Record(target) => target,
        }
    }
}

/// Lifecycle state of a broadcast job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Cancelled,
    Completed,
}

/// One bulk-send campaign: a message template, its full target list, and
/// progress counters.
///
/// Invariants held at every commit point:
/// - `success + failed + skipped == processed`
/// - `processed <= targets.len()`
/// - `status == Completed` iff `processed >= targets.len()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastJob {
    pub id: i64,
    pub tenant_id: String,
    /// Outbound channel/session identifier this job sends through.
    pub channel: String,
    pub message: String,
    pub targets: Vec<Target>,
    pub status: JobStatus,
    pub processed: u32,
    pub success: u32,
    pub failed: u32,
    pub skipped: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BroadcastJob {
    /// Whether every target has been processed.
    pub fn is_fully_processed(&self) -> bool {
        self.processed as usize >= self.targets.len()
    }

    /// Whether the outcome counters sum to the processed counter.
    pub fn counters_consistent(&self) -> bool {
        self.success + self.failed + self.skipped == self.processed
            && self.processed as usize <= self.targets.len()
    }
}

/// Input for creating a new broadcast job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub tenant_id: String,
    pub channel: String,
    pub message: String,
    pub targets: Vec<Target>,
}

/// Recurrence interval of a scheduled broadcast.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Once,
    Daily,
    Weekly,
    Monthly,
}

/// Lifecycle state of a scheduled broadcast.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Pending,
    Executing,
    Executed,
    Failed,
}

/// How a scheduled broadcast's recipients are determined at fire time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TargetSpec {
    /// A named segment resolved to a live list when the schedule fires.
    Segment { segment: String },
    /// A literal list stored with the schedule.
    List { targets: Vec<Target> },
}

/// A template for producing broadcast jobs on a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledBroadcast {
    pub id: i64,
    pub name: String,
    pub tenant_id: String,
    pub channel: String,
    pub scheduled_at: DateTime<Utc>,
    pub recurrence: Recurrence,
    pub message: String,
    pub target_spec: TargetSpec,
    pub status: ScheduleStatus,
    pub last_executed: Option<DateTime<Utc>>,
    pub execution_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new scheduled broadcast.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub name: String,
    pub tenant_id: String,
    pub channel: String,
    pub scheduled_at: DateTime<Utc>,
    pub recurrence: Recurrence,
    pub message: String,
    pub target_spec: TargetSpec,
}

/// Health reported by the outbound channel gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelHealth {
    /// Channel is connected and able to send.
    Working,
    /// Channel is reachable but impaired.
    Degraded(String),
    /// Channel is not operational.
    Down(String),
}

/// A recipient produced by segment resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub phone: String,
    #[serde(default)]
    pub name: String,
}
