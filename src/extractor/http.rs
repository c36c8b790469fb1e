//! Thin HTTP layer shared by all extractors

use crate::utils::config::ExtractorSettings;
use crate::utils::error::{ExtractError, Result};
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Page and JSON downloader
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &ExtractorSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// GET `url` and return the body as text. Non-2xx statuses become
    /// [`ExtractError::HttpStatus`].
    pub async fn get_text(
        &self,
        url: &str,
        headers: HeaderMap,
        query: &[(String, String)],
        note: &str,
    ) -> Result<String> {
        debug!("{}: {}", note, url);
        let response = self
            .client
            .get(url)
            .headers(headers)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::HttpStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response.text().await?)
    }

    /// GET `url` and parse the body as JSON
    pub async fn get_json(
        &self,
        url: &str,
        headers: HeaderMap,
        query: &[(String, String)],
        note: &str,
    ) -> Result<Value> {
        let body = self.get_text(url, headers, query, note).await?;
        Ok(serde_json::from_str(&body)?)
    }
}
