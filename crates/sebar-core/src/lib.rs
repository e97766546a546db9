// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Sebar broadcast engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Sebar workspace. The engine crate
//! consumes collaborators (channel gateway, content provider, blacklist,
//! segment resolver, notifier, store) exclusively through the traits defined
//! here.

pub mod error;
pub mod phone;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SebarError;
pub use types::{
    BroadcastJob, ChannelHealth, JobStatus, NewJob, NewSchedule, RawTarget, Recipient,
    Recurrence, ScheduleStatus, ScheduledBroadcast, Target, TargetSpec, TargetStatus,
};

// Re-export all collaborator traits at crate root.
pub use traits::{
    Blacklist, BroadcastContextSink, BroadcastStore, ChannelGateway, ContentProvider,
    MaintenanceHook, Notifier, SegmentResolver,
};
pub use traits::content::StaticContent;
