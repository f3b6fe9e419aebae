//! 取り込み API への HTTP クライアント（reqwest）

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::application::traits::{IngestResponse, IngestSink};
use crate::error::{CaptureError, Result};
use crate::utils::config::EnvConfig;

#[derive(Debug, Serialize)]
struct IngestRequest<'a> {
    text: &'a str,
}

/// `POST <base>/add` に `{"text": ...}` を送るクライアント
#[derive(Debug, Clone)]
pub struct HttpIngestClient {
    client: reqwest::Client,
    ingest_url: String,
    health_url: String,
}

impl HttpIngestClient {
    pub fn new(config: &EnvConfig) -> Result<Self> {
        Self::with_base_url(&config.api_url, config.http_timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CaptureError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            ingest_url: format!("{base}/add"),
            health_url: format!("{base}/"),
        })
    }

    pub fn ingest_url(&self) -> &str {
        &self.ingest_url
    }

    /// `GET <base>/` を送り、HTTP ステータスを返す
    pub async fn health_check(&self) -> Result<u16> {
        let response = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(|e| CaptureError::TransportFailed(e.to_string()))?;
        Ok(response.status().as_u16())
    }
}

#[async_trait]
impl IngestSink for HttpIngestClient {
    async fn post_text(&self, text: &str) -> Result<IngestResponse> {
        let response = self
            .client
            .post(&self.ingest_url)
            .json(&IngestRequest { text })
            .send()
            .await
            .map_err(|e| CaptureError::TransportFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CaptureError::TransportFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(CaptureError::TransportFailed(format!(
                "ingestion returned {status}: {}",
                body.trim()
            )));
        }

        let parsed: IngestResponse = serde_json::from_str(&body).map_err(|e| {
            CaptureError::TransportFailed(format!("invalid ingestion response: {e}"))
        })?;
        if !parsed.ok {
            return Err(CaptureError::TransportFailed(
                parsed
                    .error
                    .unwrap_or_else(|| "ingestion rejected the capture".to_string()),
            ));
        }
        Ok(parsed)
    }
}
