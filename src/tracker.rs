//! The tracker: remote audit first, local heuristics as the fallback, and the
//! last-known report that vitals updates are merged into.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

use crate::document::{self, HtmlDocument};
use crate::platform::{ConsoleChannel, EntryStream};
use crate::refresh::{PassGuard, RefreshScheduler};
use crate::remote::PageSpeedClient;
use crate::scorer::Scorer;
use crate::vitals::{self, VitalsSet};
use crate::{Error, Report, Result, ScoreSource, TrackerConfig};

/// What the tracker is currently showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerStatus {
    /// No pass has run yet
    Idle,
    /// A pass is in progress
    Loading,
    /// The latest pass produced a report
    Ready,
    /// The latest pass failed; the message is what the error view shows
    Failed(String),
}

struct TrackerState {
    status: TrackerStatus,
    latest: Option<Report>,
    vitals: Option<watch::Receiver<VitalsSet>>,
}

/// Scores one page on demand or on a timer.
///
/// Cloning is cheap; clones share the HTTP client and state. Passes never
/// overlap: a manual pass waits for the running one, a timer tick that finds
/// a pass running is skipped.
#[derive(Clone)]
pub struct SeoTracker {
    config: Arc<TrackerConfig>,
    client: Client,
    remote: Option<PageSpeedClient>,
    state: Arc<Mutex<TrackerState>>,
    passes: PassGuard,
}

impl SeoTracker {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build HTTP client: {}", e)))?;

        let remote = PageSpeedClient::from_config(client.clone(), &config);
        if remote.is_none() {
            log::info!("no PageSpeed API key configured; scores come from local analysis");
        }

        Ok(Self {
            config: Arc::new(config),
            client,
            remote,
            state: Arc::new(Mutex::new(TrackerState {
                status: TrackerStatus::Idle,
                latest: None,
                vitals: None,
            })),
            passes: PassGuard::new(),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn status(&self) -> TrackerStatus {
        self.lock().status.clone()
    }

    /// The most recent successful report, vitals merged in
    pub fn latest(&self) -> Option<Report> {
        self.lock().latest.clone()
    }

    /// Vitals observed so far through [`observe_vitals`](Self::observe_vitals)
    pub fn observed_vitals(&self) -> VitalsSet {
        self.lock()
            .vitals
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or_default()
    }

    /// Run one pass: remote audit when configured, local analysis otherwise
    /// or when the remote audit fails.
    pub async fn refresh(&self) -> Result<Report> {
        let _pass = self.passes.begin().await;
        self.run_refresh().await
    }

    /// Score supplied markup as if served from `url`. No fetch, no probing.
    pub async fn analyze_html(&self, html: &str, url: &str) -> Result<Report> {
        let url = Url::parse(url).map_err(|e| Error::ConfigError(format!("invalid url '{}': {}", url, e)))?;
        let doc = HtmlDocument::parse(html, url);
        let _pass = self.passes.begin().await;
        self.set_status(TrackerStatus::Loading);
        let report = self.score_document(&doc, false).await;
        self.settle(Ok(report))
    }

    /// Subscribe to a performance timeline. Every vitals update is merged into
    /// the latest report when that report came from local analysis; remote
    /// reports keep their own lab values. The task ends with the stream.
    pub fn observe_vitals(&self, entries: EntryStream) -> JoinHandle<()> {
        let (mut rx, _observer) = vitals::observe(entries);
        self.lock().vitals = Some(rx.clone());

        let state = self.state.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let observed = *rx.borrow_and_update();
                let mut st = state.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(report) = st
                    .latest
                    .as_mut()
                    .filter(|r| r.source == ScoreSource::Local)
                {
                    report.vitals.merge(&observed);
                }
            }
        })
    }

    /// Refresh every `refresh_interval_ms`, skipping ticks that would overlap a
    /// running pass. `None` when auto-refresh is disabled.
    pub fn spawn_auto_refresh<F>(&self, on_update: F) -> Option<JoinHandle<()>>
    where
        F: Fn(Result<Report>) + Send + Sync + 'static,
    {
        if !self.config.auto_refresh {
            return None;
        }
        let period = Duration::from_millis(self.config.refresh_interval_ms);
        let on_update = Arc::new(on_update);
        let tracker = self.clone();
        Some(RefreshScheduler::new(period, self.passes.clone()).spawn(move |pass| {
            let tracker = tracker.clone();
            let on_update = on_update.clone();
            async move {
                let outcome = tracker.run_refresh().await;
                drop(pass);
                on_update(outcome);
            }
        }))
    }

    /// One pass. The caller holds the pass guard.
    async fn run_refresh(&self) -> Result<Report> {
        self.set_status(TrackerStatus::Loading);
        let outcome = self.fetch_report().await;
        self.settle(outcome)
    }

    async fn fetch_report(&self) -> Result<Report> {
        if let Some(remote) = &self.remote {
            match remote.audit(&self.config.url).await {
                Ok(audit) => {
                    return Ok(Report::new(
                        self.config.url.clone(),
                        audit.scores,
                        audit.vitals,
                        ScoreSource::Remote,
                    ))
                }
                Err(e) => log::warn!("{}; falling back to local analysis", e),
            }
        }

        let doc = document::load(&self.client, &self.config.url, &self.config).await?;
        Ok(self.score_document(&doc, self.config.probe_resources).await)
    }

    async fn score_document(&self, doc: &HtmlDocument, probe: bool) -> Report {
        let console = ConsoleChannel::logging();
        let mut probe_task = None;

        // Failed sub-resource loads surface as console errors inside the window.
        let analysis = self
            .scorer()
            .analyze_with(doc, &console, || {
                if probe && !doc.subresources().is_empty() {
                    probe_task = Some(tokio::spawn(document::probe_resources(
                        self.client.clone(),
                        doc.subresources().to_vec(),
                        console.clone(),
                    )));
                }
            })
            .await;
        if let Some(task) = probe_task {
            task.abort();
        }

        Report::new(doc.url().as_str(), analysis.scores, analysis.vitals, ScoreSource::Local)
    }

    fn scorer(&self) -> Scorer {
        let scorer = Scorer::new(Duration::from_millis(self.config.sample_window_ms));
        match self.lock().vitals.clone() {
            Some(rx) => scorer.with_vitals(rx),
            None => scorer,
        }
    }

    fn settle(&self, outcome: Result<Report>) -> Result<Report> {
        let mut st = self.lock();
        match outcome {
            Ok(report) => {
                st.status = TrackerStatus::Ready;
                st.latest = Some(report.clone());
                Ok(report)
            }
            Err(e) => {
                log::error!("Error fetching SEO scores: {}", e);
                st.status = TrackerStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    fn set_status(&self, status: TrackerStatus) {
        self.lock().status = status;
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{PerformanceEntry, TimelineFeed};

    const PAGE: &str = r#"<html><head><title>Home</title>
        <meta name="description" content="d"><meta name="viewport" content="v">
        </head><body><main><h1>Hi</h1></main></body></html>"#;

    fn tracker() -> SeoTracker {
        SeoTracker::new(TrackerConfig {
            url: "https://example.com/".into(),
            sample_window_ms: 10,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let res = SeoTracker::new(TrackerConfig::default());
        assert!(matches!(res, Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn analyze_html_scores_markup_and_becomes_latest() {
        let tracker = tracker();
        assert_eq!(tracker.status(), TrackerStatus::Idle);

        let report = tracker.analyze_html(PAGE, "https://example.com/").await.unwrap();
        assert_eq!(report.source, ScoreSource::Local);
        // title 20 + description 20 + viewport 15
        assert_eq!(report.scores.seo(), 55);
        // no images 40 + main 20 + h1 20
        assert_eq!(report.scores.accessibility(), 80);
        assert_eq!(report.scores.best_practices(), 100);

        assert_eq!(tracker.status(), TrackerStatus::Ready);
        assert_eq!(tracker.latest().unwrap().scores, report.scores);
    }

    #[tokio::test]
    async fn vitals_updates_merge_into_latest_local_report() {
        let tracker = tracker();
        let (feed, stream) = TimelineFeed::channel();
        let merger = tracker.observe_vitals(stream);

        tracker.analyze_html(PAGE, "http://example.com/").await.unwrap();
        assert!(tracker.latest().unwrap().vitals.is_empty());

        feed.push(PerformanceEntry::LargestContentfulPaint { start_time: 1750.0 });
        feed.push(PerformanceEntry::FirstInput {
            start_time: 3000.0,
            processing_start: 3016.0,
        });
        drop(feed);
        merger.await.unwrap();

        let latest = tracker.latest().unwrap();
        assert_eq!(latest.vitals.largest_contentful_paint, 1750.0);
        assert_eq!(latest.vitals.first_input_delay, 16.0);
        assert_eq!(tracker.observed_vitals().largest_contentful_paint, 1750.0);

        // A fresh pass starts from what has been observed so far.
        let next = tracker.analyze_html(PAGE, "http://example.com/").await.unwrap();
        assert_eq!(next.vitals.first_input_delay, 16.0);
    }

    #[tokio::test]
    async fn manual_pass_waits_for_the_running_one() {
        let tracker = tracker();
        let running = tracker.passes.try_begin().expect("guard free");

        let manual = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.analyze_html(PAGE, "https://example.com/").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!manual.is_finished());
        assert_eq!(tracker.status(), TrackerStatus::Idle);

        drop(running);
        let report = manual.await.unwrap().unwrap();
        assert_eq!(report.scores.seo(), 55);
        assert!(!tracker.passes.is_running());
    }

    #[test]
    fn auto_refresh_can_be_disabled() {
        let tracker = SeoTracker::new(TrackerConfig {
            url: "https://example.com/".into(),
            auto_refresh: false,
            ..Default::default()
        })
        .unwrap();
        assert!(tracker.spawn_auto_refresh(|_| {}).is_none());
    }
}
