//! PageSpeed Insights client.
//!
//! Category scores arrive as 0-1 fractions and are scaled to 0-100; the four
//! timing audits map onto [`VitalsSet`]. A category with a null score counts
//! as 0, a missing audit leaves its vital unobserved.

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::from_http;
use crate::vitals::VitalsSet;
use crate::{Error, Result, ScoreSet, Strategy, TrackerConfig, DEFAULT_TIMEOUT_MS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageSpeedResponse {
    lighthouse_result: Option<LighthouseResult>,
}

#[derive(Debug, Deserialize)]
struct LighthouseResult {
    #[serde(default)]
    categories: HashMap<String, Category>,
    #[serde(default)]
    audits: HashMap<String, Audit>,
}

#[derive(Debug, Deserialize)]
struct Category {
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Audit {
    numeric_value: Option<f64>,
}

/// Scores and vitals from one remote audit
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteAudit {
    pub scores: ScoreSet,
    pub vitals: VitalsSet,
}

/// Client for the `runPagespeed` endpoint
#[derive(Debug, Clone)]
pub struct PageSpeedClient {
    client: Client,
    endpoint: String,
    api_key: String,
    strategy: Strategy,
    timeout_ms: u64,
}

impl PageSpeedClient {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            strategy,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Timeout reported when the underlying client gives up on a request.
    /// Match it to the timeout the `Client` was built with.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Build a client from tracker config; `None` when no API key is set.
    pub fn from_config(client: Client, config: &TrackerConfig) -> Option<Self> {
        let key = config.api_key.as_deref().filter(|k| !k.trim().is_empty())?;
        Some(Self::new(client, config.api_endpoint.clone(), key, config.strategy).with_timeout_ms(config.timeout_ms))
    }

    fn request_url(&self, page_url: &str) -> Result<Url> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("url", page_url),
                ("key", self.api_key.as_str()),
                ("strategy", self.strategy.as_str()),
            ],
        )
        .map_err(|e| Error::ConfigError(format!("invalid endpoint '{}': {}", self.endpoint, e)))
    }

    /// Run a remote audit of `page_url`.
    pub async fn audit(&self, page_url: &str) -> Result<RemoteAudit> {
        let url = self.request_url(page_url)?;
        log::info!("requesting remote audit for {} ({})", page_url, self.strategy.as_str());

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::RemoteError(from_http(e, self.timeout_ms).to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::RemoteError(format!("PageSpeed API request failed with HTTP {}", status)));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::RemoteError(format!("Failed to read response body: {}", e)))?;
        parse_audit(&body)
    }
}

/// Turn a `runPagespeed` response body into scores and vitals.
pub fn parse_audit(body: &str) -> Result<RemoteAudit> {
    let parsed: PageSpeedResponse = serde_json::from_str(body)
        .map_err(|e| Error::RemoteError(format!("Malformed PageSpeed response: {}", e)))?;
    let result = parsed
        .lighthouse_result
        .ok_or_else(|| Error::RemoteError("response has no lighthouseResult".into()))?;

    let category = |name: &str| -> Result<i64> {
        let cat = result
            .categories
            .get(name)
            .ok_or_else(|| Error::RemoteError(format!("response is missing the '{}' category", name)))?;
        Ok((cat.score.unwrap_or(0.0) * 100.0).round() as i64)
    };
    let scores = ScoreSet::new(
        category("seo")?,
        category("accessibility")?,
        category("performance")?,
        category("best-practices")?,
    );

    let audit = |name: &str| -> f64 {
        result
            .audits
            .get(name)
            .and_then(|a| a.numeric_value)
            .unwrap_or(0.0)
    };
    let vitals = VitalsSet {
        largest_contentful_paint: audit("largest-contentful-paint"),
        first_input_delay: audit("max-potential-fid"),
        cumulative_layout_shift: audit("cumulative-layout-shift"),
        first_contentful_paint: audit("first-contentful-paint"),
    };

    Ok(RemoteAudit { scores, vitals })
}
