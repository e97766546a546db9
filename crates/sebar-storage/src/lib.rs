// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Sebar broadcast engine.
//!
//! A single-writer `tokio-rusqlite` connection in WAL mode backs the whole
//! store; atomic job/schedule claims are SELECT-then-UPDATE transactions on
//! that one writer. Migrations are embedded via refinery and applied on open.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::SqliteStore;
