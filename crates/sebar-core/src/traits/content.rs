// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content variation provider trait.

use async_trait::async_trait;

use crate::error::SebarError;

/// Produces `count` textual variants of a message template.
///
/// The engine treats variant generation as opaque (an AI service in the full
/// system). Implementations should return the original template among the
/// variants; a failed generation may legitimately return a single-element
/// list containing only the template.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn variants(&self, template: &str, count: usize) -> Result<Vec<String>, SebarError>;
}

/// Passthrough provider: no AI, every variant is the original template.
///
/// Used by the binary when no content service is configured; the humanizer
/// still differentiates the messages physically downstream.
pub struct StaticContent;

#[async_trait]
impl ContentProvider for StaticContent {
    async fn variants(&self, template: &str, _count: usize) -> Result<Vec<String>, SebarError> {
        Ok(vec![template.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_content_returns_template() {
        let variants = StaticContent.variants("hello {name}", 10).await.unwrap();
        assert_eq!(variants, vec!["hello {name}".to_string()]);
    }
}
