// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sebar broadcast engine.

use thiserror::Error;

use crate::types::JobStatus;

/// The primary error type used across all Sebar collaborator traits and core operations.
#[derive(Debug, Error)]
pub enum SebarError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transient channel gateway errors (network failure, 5xx, malformed response).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The channel provider throttled us (429-class). Callers must treat this
    /// as a cool-down signal, not an ordinary delivery failure.
    #[error("rate limited by channel: {message}")]
    RateLimited { message: String },

    /// Ban-class channel error (403 or equivalent). Fatal for the job that hit it.
    #[error("channel rejected sender: {message}")]
    Banned { message: String },

    /// Content provider errors (variant generation failed).
    #[error("content provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A caller-supplied request was rejected (empty target list, campaign
    /// over the size cap, daily volume limit exceeded).
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced job does not exist.
    #[error("broadcast job {id} not found")]
    JobNotFound { id: i64 },

    /// A requested job status transition is not legal.
    #[error("cannot transition job from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SebarError {
    /// Whether this error is a rate-limit signal from the channel provider.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SebarError::RateLimited { .. })
    }

    /// Whether this error is a ban-class rejection from the channel provider.
    pub fn is_ban(&self) -> bool {
        matches!(self, SebarError::Banned { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classes_are_distinguishable() {
        let transient = SebarError::Channel {
            message: "connection reset".into(),
            source: None,
        };
        let throttled = SebarError::RateLimited {
            message: "429".into(),
        };
        let banned = SebarError::Banned {
            message: "403".into(),
        };

        assert!(!transient.is_rate_limited() && !transient.is_ban());
        assert!(throttled.is_rate_limited() && !throttled.is_ban());
        assert!(banned.is_ban() && !banned.is_rate_limited());
    }

    #[test]
    fn invalid_transition_message_names_both_states() {
        let err = SebarError::InvalidTransition {
            from: JobStatus::Completed,
            to: JobStatus::Running,
        };
        let msg = err.to_string();
        assert!(msg.contains("completed") && msg.contains("running"), "{msg}");
    }
}
