// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Sebar broadcast engine: worker loop, recurring-broadcast scheduler,
//! pacing and anti-fingerprinting, crash rescue, and the management surface.
//!
//! All external effects go through the collaborator traits in `sebar-core`;
//! this crate contains only the engine's own policy and state machines.

pub mod humanize;
pub mod manager;
pub mod pacing;
pub mod render;
pub mod rescue;
pub mod scheduler;
pub mod sender;
pub mod shutdown;
pub mod worker;

pub use manager::BroadcastManager;
pub use rescue::RescueService;
pub use scheduler::{Scheduler, TickOutcome};
pub use sender::MessageSender;
pub use worker::{CycleOutcome, Worker};
