//! Title and description prefill for a URL, via a microlink-compatible
//! metadata endpoint.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config;
use crate::error::AppError;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EndpointResponse {
    status: String,
    #[serde(default)]
    data: Option<EndpointData>,
}

#[derive(Debug, Deserialize)]
struct EndpointData {
    title: Option<String>,
    description: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Reads the endpoint body. A non-success status yields empty metadata.
pub fn parse_response(body: &str) -> Result<PageMetadata, AppError> {
    let response: EndpointResponse =
        serde_json::from_str(body).map_err(|e| AppError::Metadata(format!("unexpected response: {}", e)))?;

    if response.status != "success" {
        tracing::debug!(status = %response.status, "metadata endpoint returned no data");
        return Ok(PageMetadata::default());
    }

    Ok(response
        .data
        .map(|data| PageMetadata {
            title: non_empty(data.title),
            description: non_empty(data.description),
        })
        .unwrap_or_default())
}

pub struct MetadataClient {
    client: reqwest::Client,
    endpoint: String,
}

impl MetadataClient {
    pub fn new(cfg: &config::Metadata) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .user_agent(concat!("markshelf/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(MetadataClient {
            client,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn request_url(&self, url: &str) -> String {
        format!("{}?url={}", self.endpoint, urlencoding::encode(url))
    }

    pub async fn fetch(&self, url: &str) -> Result<PageMetadata, AppError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::Validation("url is required".to_string()));
        }

        let response = self
            .client
            .get(self.request_url(url))
            .send()
            .await
            .map_err(|e| AppError::Metadata(e.to_string()))?;

        // microlink answers 4xx with a JSON body carrying a fail status
        let body = response.text().await.map_err(|e| AppError::Metadata(e.to_string()))?;
        parse_response(&body)
    }
}
