//! Datadog logs search client
//!
//! Issues `POST /api/v2/logs/events/search` requests, sorted by ascending
//! timestamp and pinned to one storage tier, and maps the response into a
//! [`Page`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{RemoteError, Result};

use super::{LogRecord, LogSource, Page, PageRequest};

const SEARCH_PATH: &str = "/api/v2/logs/events/search";

/// [`LogSource`] backed by the Datadog V2 logs API
pub struct DatadogSource {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    app_key: String,
    storage_tier: String,
}

impl DatadogSource {
    /// Create a client from the effective configuration
    ///
    /// Fails with a configuration error when credentials are missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate_credentials()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("ddlogs/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let endpoint = format!("{}{}", config.datadog.base_url(), SEARCH_PATH);
        debug!("Datadog search endpoint: {}", endpoint);

        Ok(Self {
            http,
            endpoint,
            api_key: config.datadog.api_key.clone().unwrap_or_default(),
            app_key: config.datadog.app_key.clone().unwrap_or_default(),
            storage_tier: config.datadog.storage_tier.clone(),
        })
    }

    fn build_body<'a>(&'a self, request: &PageRequest<'a>) -> SearchRequest<'a> {
        let query = request.query;
        SearchRequest {
            filter: SearchFilter {
                query: &query.text,
                from: query.from.to_api(),
                to: query.to.to_api(),
                storage_tier: &self.storage_tier,
            },
            sort: "timestamp",
            page: SearchPage {
                limit: request.limit,
                cursor: request.cursor,
            },
        }
    }
}

#[async_trait]
impl LogSource for DatadogSource {
    async fn list_page(&self, request: &PageRequest<'_>) -> Result<Page> {
        let body = self.build_body(request);

        let response = self
            .http
            .post(&self.endpoint)
            .header("DD-API-KEY", &self.api_key)
            .header("DD-APPLICATION-KEY", &self.app_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Logs search returned HTTP {}: {}", status.as_u16(), body);
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let bytes = response.bytes().await?;
        parse_response(&bytes)
    }
}

/// Decode a search response body into a [`Page`]
fn parse_response(bytes: &[u8]) -> Result<Page> {
    let parsed: SearchResponse = serde_json::from_slice(bytes)
        .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
    Ok(parsed.into())
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    filter: SearchFilter<'a>,
    sort: &'static str,
    page: SearchPage<'a>,
}

#[derive(Debug, Serialize)]
struct SearchFilter<'a> {
    query: &'a str,
    from: String,
    to: String,
    storage_tier: &'a str,
}

#[derive(Debug, Serialize)]
struct SearchPage<'a> {
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<LogRecord>>,
    #[serde(default)]
    meta: Option<ResponseMeta>,
}

#[derive(Debug, Deserialize)]
struct ResponseMeta {
    #[serde(default)]
    page: Option<ResponsePage>,
}

#[derive(Debug, Deserialize)]
struct ResponsePage {
    #[serde(default)]
    after: Option<String>,
}

impl From<SearchResponse> for Page {
    fn from(resp: SearchResponse) -> Self {
        Page {
            records: resp.data.unwrap_or_default(),
            next_cursor: resp.meta.and_then(|m| m.page).and_then(|p| p.after),
        }
    }
}
