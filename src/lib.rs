//! seoscore
//!
//! Scores a web page for SEO, accessibility, performance and best practices,
//! and reports Core Web Vitals alongside.
//!
//! # Features
//!
//! - **Remote audits**: PageSpeed Insights scores when an API key is configured
//! - **Local heuristics**: a point rubric over the page's document, used when
//!   no key is set or the remote audit fails
//! - **Injected capabilities**: the scorer reads the page through
//!   [`platform::PageInspector`] and samples console errors through
//!   [`platform::LogInterceptor`], so it runs without a browser
//!
//! # Example
//!
//! ```no_run
//! use seoscore::{SeoTracker, TrackerConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TrackerConfig {
//!     url: "https://example.com".to_string(),
//!     ..Default::default()
//! };
//!
//! let tracker = SeoTracker::new(config)?;
//! let report = tracker.refresh().await?;
//! println!("Overall: {}/100", report.scores.overall());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde::Serialize;

pub mod error;
pub use error::{Error, Result};

pub mod document;
pub mod platform;
pub mod refresh;
pub mod remote;
pub mod report;
pub mod scorer;
pub mod signals;
pub mod tracker;
pub mod vitals;

pub use scorer::{Analysis, Scorer};
pub use signals::{ImageSignal, PageSignals};
pub use tracker::{SeoTracker, TrackerStatus};
pub use vitals::VitalsSet;

/// PageSpeed Insights v5 endpoint used when no override is configured
pub const DEFAULT_PAGESPEED_ENDPOINT: &str =
    "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

/// Default per-request HTTP timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Device profile requested from the remote audit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    #[default]
    Mobile,
    Desktop,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Mobile => "mobile",
            Strategy::Desktop => "desktop",
        }
    }
}

/// Configuration for a [`SeoTracker`]
///
/// The defaults mirror a widget embedded on a page: local analysis only (no
/// API key), a one-second console sampling window and a five-minute refresh.
///
/// # Examples
///
/// ```
/// let cfg = seoscore::TrackerConfig::default();
/// assert_eq!(cfg.sample_window_ms, 1000);
/// assert!(cfg.api_key.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Page to score
    pub url: String,
    /// PageSpeed Insights API key; when absent only local analysis runs
    pub api_key: Option<String>,
    /// Remote audit endpoint
    pub api_endpoint: String,
    /// Device profile for the remote audit
    pub strategy: Strategy,
    /// User agent string sent with page and probe requests
    pub user_agent: String,
    /// Extra HTTP headers for page requests
    pub headers: HashMap<String, String>,
    /// Timeout for each HTTP request in milliseconds
    pub timeout_ms: u64,
    /// Console error sampling window in milliseconds
    pub sample_window_ms: u64,
    /// Whether `SeoTracker::spawn_auto_refresh` starts a refresh loop
    pub auto_refresh: bool,
    /// Interval between refreshes in milliseconds
    pub refresh_interval_ms: u64,
    /// Check sub-resources during the sampling window, reporting failed
    /// loads as console errors
    pub probe_resources: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            api_endpoint: DEFAULT_PAGESPEED_ENDPOINT.to_string(),
            strategy: Strategy::default(),
            user_agent: concat!("seoscore/", env!("CARGO_PKG_VERSION")).to_string(),
            headers: HashMap::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            sample_window_ms: 1000,
            auto_refresh: true,
            refresh_interval_ms: 300_000,
            probe_resources: true,
        }
    }
}

impl TrackerConfig {
    /// Reject configurations the tracker cannot run with.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.url)
            .map_err(|e| Error::ConfigError(format!("invalid url '{}': {}", self.url, e)))?;
        url::Url::parse(&self.api_endpoint).map_err(|e| {
            Error::ConfigError(format!("invalid endpoint '{}': {}", self.api_endpoint, e))
        })?;
        if self.auto_refresh && self.refresh_interval_ms == 0 {
            return Err(Error::ConfigError(
                "refresh_interval_ms must be non-zero when auto_refresh is enabled".into(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(Error::ConfigError("timeout_ms must be non-zero".into()));
        }
        Ok(())
    }
}

/// The four category scores.
///
/// Each score is clamped to `0..=100` on construction. The overall score is
/// not stored; [`ScoreSet::overall`] always derives it from the four parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(into = "ScoreSummary")]
pub struct ScoreSet {
    seo: u8,
    accessibility: u8,
    performance: u8,
    best_practices: u8,
}

impl ScoreSet {
    pub fn new(seo: i64, accessibility: i64, performance: i64, best_practices: i64) -> Self {
        fn clamp(v: i64) -> u8 {
            v.clamp(0, 100) as u8
        }
        Self {
            seo: clamp(seo),
            accessibility: clamp(accessibility),
            performance: clamp(performance),
            best_practices: clamp(best_practices),
        }
    }

    pub fn seo(&self) -> u8 {
        self.seo
    }

    pub fn accessibility(&self) -> u8 {
        self.accessibility
    }

    pub fn performance(&self) -> u8 {
        self.performance
    }

    pub fn best_practices(&self) -> u8 {
        self.best_practices
    }

    /// Mean of the four scores, rounded half up.
    pub fn overall(&self) -> u8 {
        let sum = self.seo as u32
            + self.accessibility as u32
            + self.performance as u32
            + self.best_practices as u32;
        ((sum + 2) / 4) as u8
    }
}

/// Serialized form of a [`ScoreSet`], overall included
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreSummary {
    performance: u8,
    accessibility: u8,
    best_practices: u8,
    seo: u8,
    overall: u8,
}

impl From<ScoreSet> for ScoreSummary {
    fn from(s: ScoreSet) -> Self {
        Self {
            performance: s.performance,
            accessibility: s.accessibility,
            best_practices: s.best_practices,
            seo: s.seo,
            overall: s.overall(),
        }
    }
}

/// Where a report's scores came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    /// PageSpeed Insights
    Remote,
    /// Local heuristic analysis
    Local,
}

/// A scored page as held by the tracker and printed by the CLI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub url: String,
    pub scores: ScoreSet,
    pub vitals: VitalsSet,
    pub source: ScoreSource,
    pub updated_at: DateTime<Local>,
}

impl Report {
    pub fn new(url: impl Into<String>, scores: ScoreSet, vitals: VitalsSet, source: ScoreSource) -> Self {
        Self {
            url: url.into(),
            scores,
            vitals,
            source,
            updated_at: Local::now(),
        }
    }
}
