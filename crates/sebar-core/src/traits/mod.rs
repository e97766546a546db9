// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions consumed by the broadcast engine.
//!
//! Implementations live outside the engine (HTTP gateway adapter, AI content
//! service, tenant database); the engine only depends on these seams. All
//! traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod content;
pub mod gateway;
pub mod hooks;
pub mod store;

pub use content::ContentProvider;
pub use gateway::ChannelGateway;
pub use hooks::{Blacklist, BroadcastContextSink, MaintenanceHook, Notifier, SegmentResolver};
pub use store::BroadcastStore;
