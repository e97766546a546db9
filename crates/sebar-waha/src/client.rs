// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WAHA REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use sebar_config::model::WahaConfig;
use sebar_core::{ChannelGateway, ChannelHealth, SebarError};
use serde::Deserialize;
use tracing::{debug, warn};

/// WAHA-backed channel gateway.
///
/// One client serves all sessions; the `channel` argument of each call
/// selects the WAHA session name.
#[derive(Debug, Clone)]
pub struct WahaGateway {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SessionStatus {
    status: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExistsResponse {
    number_exists: bool,
}

impl WahaGateway {
    pub fn new(config: &WahaConfig) -> Result<Self, SebarError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if let Some(api_key) = &config.api_key {
            headers.insert(
                "x-api-key",
                HeaderValue::from_str(api_key)
                    .map_err(|e| SebarError::Config(format!("invalid WAHA API key: {e}")))?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SebarError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// WAHA chat identifiers carry a `@c.us` suffix.
    fn chat_id(phone: &str) -> String {
        if phone.contains('@') {
            phone.to_string()
        } else {
            format!("{phone}@c.us")
        }
    }

    fn transport_err(e: reqwest::Error) -> SebarError {
        SebarError::Channel {
            message: format!("WAHA request failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

#[async_trait]
impl ChannelGateway for WahaGateway {
    async fn health(&self, channel: &str) -> Result<ChannelHealth, SebarError> {
        let url = format!("{}/api/sessions/{channel}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::transport_err)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(ChannelHealth::Down(format!("session '{channel}' not found")));
        }
        if !response.status().is_success() {
            return Ok(ChannelHealth::Down(format!(
                "session status check returned {}",
                response.status()
            )));
        }

        let status: SessionStatus = response.json().await.map_err(Self::transport_err)?;
        debug!(channel, status = %status.status, "session status");
        Ok(match status.status.as_str() {
            "WORKING" => ChannelHealth::Working,
            "STARTING" | "SCAN_QR_CODE" => ChannelHealth::Degraded(status.status),
            _ => ChannelHealth::Down(status.status),
        })
    }

    async fn send_text(&self, phone: &str, text: &str, channel: &str) -> Result<(), SebarError> {
        let url = format!("{}/api/sendText", self.base_url);
        let payload = serde_json::json!({
            "session": channel,
            "chatId": Self::chat_id(phone),
            "text": text,
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(Self::transport_err)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(%status, phone, "sendText rejected");
        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(SebarError::RateLimited {
                message: format!("WAHA returned 429: {body}"),
            }),
            StatusCode::FORBIDDEN => Err(SebarError::Banned {
                message: format!("WAHA returned 403: {body}"),
            }),
            _ => Err(SebarError::Channel {
                message: format!("WAHA returned {status}: {body}"),
                source: None,
            }),
        }
    }

    async fn exists(&self, phone: &str, channel: &str) -> Result<bool, SebarError> {
        let url = format!("{}/api/contacts/check-exists", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("phone", phone), ("session", channel)])
            .send()
            .await
            .map_err(Self::transport_err)?;

        if !response.status().is_success() {
            return Err(SebarError::Channel {
                message: format!("contact check returned {}", response.status()),
                source: None,
            });
        }

        let body: ExistsResponse = response.json().await.map_err(Self::transport_err)?;
        Ok(body.number_exists)
    }
}
