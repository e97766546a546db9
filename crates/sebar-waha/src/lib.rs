// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WAHA (WhatsApp HTTP API) adapter implementing [`ChannelGateway`].
//!
//! Translates the engine's send/exists/health primitives into WAHA REST
//! calls and maps the provider's HTTP error classes onto the engine's error
//! taxonomy: 429 is a rate-limit signal, 403 is ban-class, everything else
//! non-success is a transient channel error.

mod client;

pub use client::WahaGateway;
